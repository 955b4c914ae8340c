// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that name the things this harness works
// with: which dataset, which architecture, which prior, and
// the file paths an experiment owns.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Experiment identifiers and the checkpoint/history path builder
pub mod experiment;

// Core abstractions (traits) that other layers implement
pub mod traits;
