// ============================================================
// Layer 5 — Optimizer
// ============================================================
// One optimizer step per training sample:
//
//   1. Global-norm clipping over all four gradient tensors
//        norm = sqrt(Σ g²)
//        if norm > threshold: g ← g · threshold / norm
//
//   2. Update rule
//        SGD:   θ ← θ − lr · g
//        Adam:  m ← β1·m + (1−β1)·g          (mean)
//               v ← β2·v + (1−β2)·g²         (variance)
//               lr_t = lr · sqrt(1−β2^t) / (1−β1^t)
//               θ ← θ − lr_t · m / (sqrt(v) + ε)
//
//   3. Gradients reset to zero
//
// Adam moment buffers only exist on models built for Adam, so an
// SGD run never pays for them in the memory budget.
//
// Reference: Kingma & Ba (2015) Adam
//            Pascanu et al. (2013) gradient clipping

use serde::{Deserialize, Serialize};

use crate::domain::architecture::Architecture;
use crate::domain::error::{TcnError, TcnResult};
use crate::ml::model::TrainableModel;
use crate::ml::params::ParamSet;

/// Maximum global gradient norm.
pub const CLIP_THRESHOLD: f32 = 1.0;

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPSILON: f32 = 1e-8;

/// Which update rule the optimizer applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub kind: OptimizerKind,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    pub clip_threshold: f32,
}

impl OptimizerConfig {
    pub fn new(kind: OptimizerKind, learning_rate: f32) -> Self {
        Self {
            kind,
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            clip_threshold: CLIP_THRESHOLD,
        }
    }

    pub fn sgd(learning_rate: f32) -> Self {
        Self::new(OptimizerKind::Sgd, learning_rate)
    }

    pub fn adam(learning_rate: f32) -> Self {
        Self::new(OptimizerKind::Adam, learning_rate)
    }
}

/// Adam first/second moments and the shared timestep.
#[derive(Debug, Clone)]
pub struct AdamMoments {
    pub(super) m: ParamSet<f32>,
    pub(super) v: ParamSet<f32>,
    pub(super) step: u64,
}

impl AdamMoments {
    pub fn new(arch: &Architecture) -> Self {
        Self { m: ParamSet::zeros(arch), v: ParamSet::zeros(arch), step: 0 }
    }

    /// Number of Adam updates applied so far.
    pub fn step(&self) -> u64 {
        self.step
    }
}

/// Scale `grads` down so their global norm is at most `threshold`.
/// Returns the norm measured before clipping.
pub fn clip_gradients(grads: &mut ParamSet<f32>, threshold: f32) -> f32 {
    let norm = grads.l2_norm();
    if norm > threshold {
        grads.scale(threshold / norm);
    }
    norm
}

/// Bias-corrected Adam step size for timestep `step` (1-based).
pub fn bias_corrected_rate(learning_rate: f32, beta1: f32, beta2: f32, step: u64) -> f32 {
    let t = step as f32;
    let correction1 = (1.0 - beta1.powf(t)).max(f32::EPSILON);
    let correction2 = (1.0 - beta2.powf(t)).max(0.0);
    learning_rate * correction2.sqrt() / correction1
}

/// Clip, update and zero the gradients of `model`.
/// Returns the gradient norm measured before clipping.
pub fn step(model: &mut TrainableModel, cfg: &OptimizerConfig) -> TcnResult<f32> {
    // Nothing is touched when the model cannot take this update
    let moments = match cfg.kind {
        OptimizerKind::Sgd => None,
        OptimizerKind::Adam => Some(model.moments.as_mut().ok_or_else(|| {
            TcnError::InvalidConfig("Adam update on a model built without moment buffers".into())
        })?),
    };

    let norm = clip_gradients(&mut model.grads, cfg.clip_threshold);

    match moments {
        None => {
            for (p, g) in model.params.values_mut().zip(model.grads.values()) {
                *p -= cfg.learning_rate * g;
            }
        }
        Some(moments) => {
            moments.step += 1;
            let lr_t = bias_corrected_rate(cfg.learning_rate, cfg.beta1, cfg.beta2, moments.step);

            let updates = model
                .params
                .values_mut()
                .zip(model.grads.values())
                .zip(moments.m.values_mut())
                .zip(moments.v.values_mut());
            for (((p, &g), m), v) in updates {
                *m = cfg.beta1 * *m + (1.0 - cfg.beta1) * g;
                *v = cfg.beta2 * *v + (1.0 - cfg.beta2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + cfg.epsilon);
            }
        }
    }

    model.grads.fill(0.0);
    Ok(norm)
}
