// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Everything that touches the outside world: model files on
// disk, the metrics CSV and the inference wire protocol.
//
//   checkpoint.rs — model.bin / model_q8.bin / train_config.json
//   metrics.rs    — per-epoch CSV log
//   wire.rs       — framing of inference requests and responses
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

/// Model and configuration persistence
pub mod checkpoint;

/// Per-epoch metrics CSV
pub mod metrics;

/// Inference request/response codec
pub mod wire;
