// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// The two files an experiment leaves on disk:
//
//   checkpoint.rs — model weights at the derived .cpkt path,
//                   plus the run config as JSON beside it
//
//   history.rs    — one CSV row (epoch, loss, val_loss) per
//                   completed epoch; its row count drives resume
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-epoch history CSV
pub mod history;
