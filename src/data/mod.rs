// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw recording files
// all the way to training-ready windows.
//
// The pipeline flows in this order:
//
//   <root>/<gesture>/*.csv
//       │
//       ▼
//   GestureDirLoader  → two-pass sliding-window extraction
//       │
//       ▼
//   WindowDataset     → one contiguous buffer + parallel labels
//       │
//       ├──► shuffle()       (joint Fisher-Yates, per epoch)
//       │
//       └──► split_indices() (train / validation partition)
//
// Each module is responsible for exactly one step.
//
// Reference: Rust Book §8 (Collections)
//            Rust Book §13 (Iterators and Closures)

/// Loads recordings from per-gesture directories
pub mod loader;

/// Contiguous window storage with joint shuffling
pub mod dataset;

/// Splits sample indices into train/validation sets
pub mod splitter;
