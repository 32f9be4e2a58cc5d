use rand::Rng;

use crate::domain::error::{TcnError, TcnResult};
use crate::domain::sample::Sample;

/// Every training window in one contiguous buffer, with a parallel
/// label vector. Window `i` occupies `data[i * window_len..(i + 1) * window_len]`
/// and is labelled `labels[i]`.
#[derive(Debug, Clone)]
pub struct WindowDataset {
    window_len: usize,
    data: Vec<f32>,
    labels: Vec<usize>,
}

impl WindowDataset {
    /// Wrap pre-filled buffers. The data length must be exactly
    /// `labels.len() * window_len`.
    pub fn from_parts(window_len: usize, data: Vec<f32>, labels: Vec<usize>) -> TcnResult<Self> {
        let expected = labels.len() * window_len;
        if window_len == 0 || data.len() != expected {
            return Err(TcnError::DimensionMismatch { expected, actual: data.len() });
        }
        Ok(Self { window_len, data, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Borrow window `index` together with its label.
    pub fn sample(&self, index: usize) -> Sample<'_> {
        let start = index * self.window_len;
        Sample {
            frames: &self.data[start..start + self.window_len],
            label: self.labels[index],
        }
    }

    /// Number of windows per class, for logging class balance.
    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; num_classes];
        for &label in &self.labels {
            if let Some(c) = counts.get_mut(label) {
                *c += 1;
            }
        }
        counts
    }

    /// Fisher-Yates shuffle applied to windows and labels together,
    /// so every window keeps the label it was loaded with.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in (1..self.len()).rev() {
            let j = rng.gen_range(0..=i);
            if i != j {
                self.swap_windows(j, i);
                self.labels.swap(i, j);
            }
        }
    }

    /// Swap two windows in place; requires `lo < hi`.
    fn swap_windows(&mut self, lo: usize, hi: usize) {
        let w = self.window_len;
        let (head, tail) = self.data.split_at_mut(hi * w);
        head[lo * w..(lo + 1) * w].swap_with_slice(&mut tail[..w]);
    }
}
