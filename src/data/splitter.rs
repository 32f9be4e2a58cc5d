// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Randomly partitions sample indices into two sets:
//   - Training set:   used to update model weights
//   - Validation set: used to measure accuracy on unseen windows
//
// Only indices are shuffled. The dataset buffer itself stays in
// place, so the split never copies a window and can never
// separate a window from its label.
//
// Split rule: the first ⌊total × train_fraction⌋ indices of a
// random permutation go to training, the rest to validation.
// The two sets are disjoint and together cover 0..total.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation

use rand::{seq::SliceRandom, Rng};

/// Disjoint index partition of a dataset.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Shuffle `0..total` and split it into (train, validation).
///
/// `train_fraction` is clamped to `[0, 1]`.
pub fn split_indices<R: Rng + ?Sized>(total: usize, train_fraction: f32, rng: &mut R) -> Split {
    let mut indices: Vec<usize> = (0..total).collect();
    indices.shuffle(rng);

    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f32) * fraction).floor() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in `indices` and returns [n..total)
    let validation = indices.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        indices.len(),
        validation.len(),
    );

    Split { train: indices, validation }
}
