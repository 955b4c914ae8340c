// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The runner is written against these traits rather than the
// concrete loaders, so tests can hand it an in-memory dataset
// and the CLI can hand it the real one.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::data::dataset::DatasetPair;
use crate::domain::experiment::DatasetKey;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Anything that can produce the (train, test) split for a dataset.
///
/// Implementations:
///   - VisionSource → MNIST from burn, OMNIGLOT / CALTECH from image folders
pub trait DatasetSource {
    /// Load both splits for `key`. Pixels must already be scaled to [0, 1].
    fn load(&self, key: DatasetKey) -> Result<DatasetPair>;
}
