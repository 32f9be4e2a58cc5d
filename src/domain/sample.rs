// ============================================================
// Layer 3 — Sample & Classification
// ============================================================
// A Sample borrows one window out of the contiguous dataset
// buffer, so iterating the dataset never copies frames.

/// One labelled training window of T frames × F features.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    /// Frame-major values: `frames[t * F + f]`
    pub frames: &'a [f32],
    /// Index of the gesture class in `[0, N)`
    pub label: usize,
}

/// Winning class and its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class_index: usize,
    pub confidence: f32,
}

impl Classification {
    /// Pick the most probable class. Ties go to the lower index.
    pub fn from_probabilities(probs: &[f32]) -> Self {
        let (class_index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
        Self { class_index, confidence }
    }
}
