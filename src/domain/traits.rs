// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits instead
// of concrete types:
//   - GestureDirLoader implements WindowSource
//   - Inferencer implements Classifier
//
// The inference server only needs "something that classifies a
// window", which keeps the socket handling testable with a stub
// classifier and no model file on disk.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::data::dataset::WindowDataset;
use crate::domain::error::TcnResult;
use crate::domain::sample::Classification;

// ─── WindowSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled training windows.
pub trait WindowSource {
    /// Load every available window into one exactly-sized dataset.
    fn load_windows(&self) -> Result<WindowDataset>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// Any component that can classify one input window.
pub trait Classifier {
    /// Number of values one window must contain.
    fn window_len(&self) -> usize;

    /// Classify a window. `Ok(None)` means no model is loaded.
    fn classify(&self, window: &[f32]) -> TcnResult<Option<Classification>>;
}
