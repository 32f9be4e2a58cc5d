// ============================================================
// Layer 3 — Architecture
// ============================================================
// The network has exactly one topology:
//
//   input [T, F]
//       │
//       ▼
//   causal dilated Conv1d (F → C channels, kernel K, dilation D)
//       │
//       ▼
//   Leaky ReLU → global average pool over T
//       │
//       ▼
//   Dense (C → N) → softmax
//
// The six numbers F, T, C, K, N, D fully determine every
// buffer size in the system. They travel together as one
// `Architecture` value so that the trainer, the serializer,
// the quantizer and the inference server can never disagree
// about a dimension without noticing.
//
// The memory budget simulates the SRAM limit of the target
// microcontroller: a trainable model that would not fit is
// rejected when it is constructed, never half-way through a run.

use serde::{Deserialize, Serialize};
use std::mem::size_of;

use crate::domain::error::{TcnError, TcnResult};

/// Simulated SRAM available to the application (1 MiB).
pub const DEFAULT_MEMORY_BUDGET: usize = 1024 * 1024;

/// Shape of the one-block TCN classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    /// Values per frame (landmarks × coordinates)
    pub features: usize,
    /// Frames per window
    pub seq_len: usize,
    /// Output channels of the convolution
    pub channels: usize,
    /// Kernel taps per channel
    pub kernel_size: usize,
    /// Number of gesture classes
    pub num_classes: usize,
    /// Spacing between kernel taps, shared by training and inference
    pub dilation: usize,
}

/// 20 landmarks × 3 coordinates, 100-frame windows, 16 channels,
/// kernel 3, three gestures, no dilation.
impl Default for Architecture {
    fn default() -> Self {
        Self {
            features: 60,
            seq_len: 100,
            channels: 16,
            kernel_size: 3,
            num_classes: 3,
            dilation: 1,
        }
    }
}

impl Architecture {
    /// Build and validate an architecture in one step.
    pub fn new(
        features: usize,
        seq_len: usize,
        channels: usize,
        kernel_size: usize,
        num_classes: usize,
        dilation: usize,
    ) -> TcnResult<Self> {
        let arch = Self { features, seq_len, channels, kernel_size, num_classes, dilation };
        arch.validate()?;
        Ok(arch)
    }

    /// Every dimension must be at least 1.
    pub fn validate(&self) -> TcnResult<()> {
        for (name, value) in self.fields() {
            if value == 0 {
                return Err(TcnError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// The dimensions in the order they are written to a model header.
    pub fn fields(&self) -> [(&'static str, usize); 6] {
        [
            ("features", self.features),
            ("seq_len", self.seq_len),
            ("channels", self.channels),
            ("kernel_size", self.kernel_size),
            ("num_classes", self.num_classes),
            ("dilation", self.dilation),
        ]
    }

    /// Number of values in one input window (T × F).
    pub fn window_len(&self) -> usize {
        self.seq_len * self.features
    }

    pub fn tcn_weight_count(&self) -> usize {
        self.channels * self.features * self.kernel_size
    }

    pub fn tcn_bias_count(&self) -> usize {
        self.channels
    }

    pub fn head_weight_count(&self) -> usize {
        self.num_classes * self.channels
    }

    pub fn head_bias_count(&self) -> usize {
        self.num_classes
    }

    /// Total learnable parameters across both layers.
    pub fn param_count(&self) -> usize {
        self.tcn_weight_count() + self.tcn_bias_count() + self.head_weight_count() + self.head_bias_count()
    }

    /// How many frames back the convolution can see, including the current one.
    pub fn receptive_field(&self) -> usize {
        (self.kernel_size - 1) * self.dilation + 1
    }

    /// Bytes held by a trainable model: parameters and gradients,
    /// Adam moments when requested, the retained activations with
    /// their gradient scratch, and the pooled/probability buffers.
    pub fn trainable_bytes(&self, with_moments: bool) -> usize {
        let tensor_copies = if with_moments { 4 } else { 2 };
        let activation_buffers = 2 * self.channels * self.seq_len;
        let small_buffers = 2 * self.channels + self.num_classes;
        (tensor_copies * self.param_count() + activation_buffers + small_buffers) * size_of::<f32>()
    }

    /// Bytes held by an inference-only model (weights and biases).
    pub fn inference_bytes(&self) -> usize {
        self.param_count() * size_of::<f32>()
    }

    /// Fail if a trainable model of this shape would not fit in `budget`.
    /// Returns the required size on success.
    pub fn check_budget(&self, with_moments: bool, budget: usize) -> TcnResult<usize> {
        let required = self.trainable_bytes(with_moments);
        if required >= budget {
            return Err(TcnError::MemoryBudgetExceeded { required, budget });
        }
        Ok(required)
    }
}
