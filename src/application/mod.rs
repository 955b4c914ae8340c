// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal: running an experiment or inspecting a finished one.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Files are touched only through Layer 6 stores
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Resumable experiment runner and its configuration
pub mod runner;

// Reload + test-set summary of a trained experiment
pub mod inspect;
