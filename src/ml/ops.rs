// ============================================================
// Layer 5 — Numerical Building Blocks
// ============================================================
// Stateless math shared by the training forward pass, the
// backward pass and the lean inference forward pass. Keeping
// the convolution indexing in one place guarantees that every
// pass sees exactly the same taps.
//
// Causal dilated convolution, tap k of K at time t reads frame
//
//   t − (K − 1 − k) · D
//
// so the last tap is always the current frame and earlier taps
// look D, 2D, ... frames into the past. Taps before frame 0 are
// treated as zero padding.

use crate::domain::architecture::Architecture;

/// Slope of Leaky ReLU for non-positive inputs.
pub const LEAKY_SLOPE: f32 = 0.01;

/// Lower bound applied to the target probability inside the log.
pub const LOG_FLOOR: f32 = 1e-9;

pub fn leaky_relu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        LEAKY_SLOPE * x
    }
}

/// Derivative expressed through the stored activation output:
/// the output is positive exactly when the input was.
pub fn leaky_relu_derivative(activation: f32) -> f32 {
    if activation > 0.0 {
        1.0
    } else {
        LEAKY_SLOPE
    }
}

/// Input frame read by tap `k` at output time `t`, or `None`
/// when the tap falls into the causal padding.
pub fn tap_index(t: usize, k: usize, kernel_size: usize, dilation: usize) -> Option<usize> {
    t.checked_sub((kernel_size - 1 - k) * dilation)
}

/// Pre-activation convolution output of channel `c_out` at time `t`.
pub fn conv_at(
    arch: &Architecture,
    weights: &[f32],
    biases: &[f32],
    input: &[f32],
    c_out: usize,
    t: usize,
) -> f32 {
    let (f_in, k_size) = (arch.features, arch.kernel_size);
    let channel_weights = &weights[c_out * f_in * k_size..(c_out + 1) * f_in * k_size];

    let mut acc = biases[c_out];
    for k in 0..k_size {
        let Some(src) = tap_index(t, k, k_size, arch.dilation) else {
            continue;
        };
        let frame = &input[src * f_in..(src + 1) * f_in];
        for (cin, &x) in frame.iter().enumerate() {
            acc += x * channel_weights[cin * k_size + k];
        }
    }
    acc
}

/// Dense layer: `out[j] = b[j] + Σ_i x[i] · w[j·len(x) + i]`.
pub fn dense_forward(weights: &[f32], biases: &[f32], x: &[f32], out: &mut [f32]) {
    for (j, o) in out.iter_mut().enumerate() {
        let row = &weights[j * x.len()..(j + 1) * x.len()];
        *o = biases[j] + row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>();
    }
}

/// Numerically stable softmax; subtracting the max logit keeps
/// every exponent ≤ 0.
pub fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}

/// Cross-entropy of a probability vector against a class label.
pub fn cross_entropy(probs: &[f32], label: usize) -> f32 {
    -probs[label].max(LOG_FLOOR).ln()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaky_relu_values() {
        assert_eq!(leaky_relu(2.5), 2.5);
        assert_eq!(leaky_relu(0.0), 0.0);
        assert!((leaky_relu(-3.0) - -0.03).abs() < 1e-7);
    }

    #[test]
    fn test_leaky_relu_derivative() {
        assert_eq!(leaky_relu_derivative(0.7), 1.0);
        assert_eq!(leaky_relu_derivative(0.0), LEAKY_SLOPE);
        assert_eq!(leaky_relu_derivative(-0.2), LEAKY_SLOPE);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut v = [1.0, 2.0, 3.0, -40.0];
        softmax_in_place(&mut v);
        let sum: f32 = v.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(v.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(v[2] > v[1] && v[1] > v[0]);
    }

    #[test]
    fn test_softmax_survives_huge_logits() {
        let mut v = [1000.0, 1000.0];
        softmax_in_place(&mut v);
        assert!((v[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tap_index_is_causal_and_dilated() {
        // K = 3, D = 2: taps read t-4, t-2, t
        assert_eq!(tap_index(5, 0, 3, 2), Some(1));
        assert_eq!(tap_index(5, 1, 3, 2), Some(3));
        assert_eq!(tap_index(5, 2, 3, 2), Some(5));
        assert_eq!(tap_index(1, 0, 3, 2), None);
    }

    #[test]
    fn test_conv_at_zero_padding() {
        // F = 1, K = 2, one channel, weights [w_past, w_now] = [10, 1]
        let arch = Architecture::new(1, 3, 1, 2, 1, 1).unwrap();
        let input = [1.0, 2.0, 3.0];
        assert_eq!(conv_at(&arch, &[10.0, 1.0], &[0.5], &input, 0, 0), 0.5 + 1.0);
        assert_eq!(conv_at(&arch, &[10.0, 1.0], &[0.5], &input, 0, 2), 0.5 + 20.0 + 3.0);
    }

    #[test]
    fn test_cross_entropy_is_floored() {
        assert!((cross_entropy(&[0.5, 0.5], 0) - std::f32::consts::LN_2).abs() < 1e-6);
        assert!((cross_entropy(&[1.0, 0.0], 1) - 1e9f32.ln()).abs() < 1e-3);
    }
}
