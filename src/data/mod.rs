// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a dataset key to tensor batches:
//
//   DatasetKey
//       │
//       ▼
//   VisionSource      → MNIST from burn, OMNIGLOT / CALTECH from folders
//       │
//       ▼
//   DatasetPair       → (train, test) ImageSets in [0, 1]
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → stacks items into [batch, input_dim]
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Dataset sources keyed by DatasetKey
pub mod loader;

/// ImageSet / DatasetPair and Burn's Dataset impl
pub mod dataset;

/// Implements Burn's Batcher trait for flattened images
pub mod batcher;
