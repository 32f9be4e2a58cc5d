// ============================================================
// Layer 5 — Backward Pass
// ============================================================
// Per-sample gradients of the cross-entropy loss, computed from
// the activations the training forward pass left behind:
//
//   d_logits[j]   = probs[j] − 1{j = label}
//   grad_wh[j,i] += d_logits[j] · pooled[i]
//   grad_bh[j]   += d_logits[j]
//   d_pooled[i]   = Σ_j d_logits[j] · wh[j,i]
//   d_act[c,t]    = d_pooled[c] / T · LeakyReLU'(act[c,t])
//   grad_w[c,cin,k] += Σ_t d_act[c,t] · x[t − (K−1−k)·D, cin]
//   grad_b[c]       += Σ_t d_act[c,t]
//
// The input is never trained, so no input gradient is formed.
// Calling backward before any forward pass is allowed: it runs
// against the zero-initialised buffers.

use crate::domain::error::{TcnError, TcnResult};
use crate::ml::model::TrainableModel;
use crate::ml::ops::{leaky_relu_derivative, tap_index};

impl TrainableModel {
    /// Overwrite the gradients with those of one `(input, label)` pair.
    pub fn backward(&mut self, input: &[f32], label: usize) -> TcnResult<()> {
        let arch = self.arch;
        if input.len() != arch.window_len() {
            return Err(TcnError::DimensionMismatch { expected: arch.window_len(), actual: input.len() });
        }
        if label >= arch.num_classes {
            return Err(TcnError::InvalidLabel { label, num_classes: arch.num_classes });
        }

        let (c_len, t_len, f_len, k_len) = (arch.channels, arch.seq_len, arch.features, arch.kernel_size);
        self.grads.fill(0.0);

        // ── Dense head ────────────────────────────────────────────────────────
        self.d_pooled.fill(0.0);
        for j in 0..arch.num_classes {
            let d_logit = self.probs[j] - if j == label { 1.0 } else { 0.0 };
            self.grads.head_biases[j] += d_logit;

            let row = j * c_len..(j + 1) * c_len;
            let grad_row = &mut self.grads.head_weights[row.clone()];
            for (i, (g, &w)) in grad_row.iter_mut().zip(&self.params.head_weights[row]).enumerate() {
                *g += d_logit * self.pooled[i];
                self.d_pooled[i] += d_logit * w;
            }
        }

        // ── Pooling + Leaky ReLU ──────────────────────────────────────────────
        for c in 0..c_len {
            let upstream = self.d_pooled[c] / t_len as f32;
            for t in 0..t_len {
                let idx = c * t_len + t;
                self.d_activations[idx] = upstream * leaky_relu_derivative(self.activations[idx]);
            }
        }

        // ── Causal dilated convolution ────────────────────────────────────────
        for c in 0..c_len {
            let grad_w = &mut self.grads.tcn_weights[c * f_len * k_len..(c + 1) * f_len * k_len];
            for t in 0..t_len {
                let g = self.d_activations[c * t_len + t];
                self.grads.tcn_biases[c] += g;

                for k in 0..k_len {
                    let Some(src) = tap_index(t, k, k_len, arch.dilation) else {
                        continue;
                    };
                    let frame = &input[src * f_len..(src + 1) * f_len];
                    for (cin, &x) in frame.iter().enumerate() {
                        grad_w[cin * k_len + k] += g * x;
                    }
                }
            }
        }

        Ok(())
    }
}
