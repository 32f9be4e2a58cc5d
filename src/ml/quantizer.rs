// ============================================================
// Layer 5 — Post-Training Quantizer
// ============================================================
// Fixed-scale symmetric int8 quantization:
//
//   q = clamp(round(v · 127), −128, 127)
//
// applied independently to every value of all four tensors.
// The scale is a global constant that every consumer of a
// quantized model must assume; it is not stored in the file.
// Values outside [−1, 1] saturate.
//
// Quantized models are produced once, written to disk to
// measure deployment size, and never loaded back for training.

use crate::domain::architecture::Architecture;
use crate::ml::params::ParamSet;

/// Multiplier mapping the float range [−1, 1] onto int8.
pub const QUANT_SCALE: f32 = 127.0;

pub fn quantize_value(v: f32) -> i8 {
    (v * QUANT_SCALE).round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

pub fn dequantize_value(q: i8) -> f32 {
    q as f32 / QUANT_SCALE
}

/// An int8 copy of a float parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedModel {
    arch: Architecture,
    params: ParamSet<i8>,
}

impl QuantizedModel {
    pub fn from_float(arch: Architecture, params: &ParamSet<f32>) -> Self {
        Self { arch, params: params.map(|&v| quantize_value(v)) }
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    pub fn params(&self) -> &ParamSet<i8> {
        &self.params
    }

    /// Payload size in bytes (one byte per parameter).
    pub fn byte_size(&self) -> usize {
        self.params.len()
    }

    /// Largest absolute difference between `original` and the
    /// dequantized values, ignoring saturated entries.
    pub fn max_abs_error(&self, original: &ParamSet<f32>) -> f32 {
        original
            .values()
            .zip(self.params.values())
            .filter(|(v, _)| v.abs() <= 1.0)
            .map(|(&v, &q)| (v - dequantize_value(q)).abs())
            .fold(0.0, f32::max)
    }
}
