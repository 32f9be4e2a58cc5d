// ============================================================
// Layer 5 — TCN Classifier Models
// ============================================================
// Two views of the same network:
//
//   TrainableModel  — parameters + gradients + optional Adam
//                     moments + every buffer the backward pass
//                     needs. Checked against the memory budget
//                     when it is built.
//
//   InferenceModel  — parameters only. The forward pass keeps
//                     one running sum per channel instead of the
//                     [C][T] activation map, so it can run
//                     through a shared reference.
//
// Forward pass (both views):
//   conv[c,t]  = b[c] + Σ_{cin,k} x[t − (K−1−k)·D, cin] · w[c,cin,k]
//   act[c,t]   = LeakyReLU(conv[c,t])
//   pooled[c]  = mean_t act[c,t]
//   logits[j]  = b[j] + Σ_c pooled[c] · w[j,c]
//   probs      = softmax(logits)

use rand::Rng;

use crate::domain::architecture::Architecture;
use crate::domain::error::{TcnError, TcnResult};
use crate::domain::sample::Classification;
use crate::ml::ops::{conv_at, dense_forward, leaky_relu, softmax_in_place};
use crate::ml::optimizer::{AdamMoments, OptimizerKind};
use crate::ml::params::ParamSet;

fn check_len(expected: usize, actual: usize) -> TcnResult<()> {
    if expected != actual {
        return Err(TcnError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn check_params(arch: &Architecture, params: &ParamSet<f32>) -> TcnResult<()> {
    let expected = [
        arch.tcn_weight_count(),
        arch.tcn_bias_count(),
        arch.head_weight_count(),
        arch.head_bias_count(),
    ];
    for (tensor, expected) in params.tensors().iter().zip(expected) {
        check_len(expected, tensor.len())?;
    }
    Ok(())
}

// ─── TrainableModel ───────────────────────────────────────────────────────────

/// Model state for one training run.
#[derive(Debug, Clone)]
pub struct TrainableModel {
    pub(super) arch: Architecture,
    pub(super) params: ParamSet<f32>,
    pub(super) grads: ParamSet<f32>,
    pub(super) moments: Option<AdamMoments>,
    /// Leaky ReLU outputs, `[C][T]`
    pub(super) activations: Vec<f32>,
    /// Scratch for the activation gradient, `[C][T]`
    pub(super) d_activations: Vec<f32>,
    pub(super) pooled: Vec<f32>,
    pub(super) d_pooled: Vec<f32>,
    pub(super) probs: Vec<f32>,
}

impl TrainableModel {
    /// He-initialised model. Fails before allocating anything large
    /// if the model would not fit in `budget` bytes.
    pub fn new<R: Rng + ?Sized>(
        arch: Architecture,
        optimizer: OptimizerKind,
        budget: usize,
        rng: &mut R,
    ) -> TcnResult<Self> {
        arch.validate()?;
        arch.check_budget(optimizer == OptimizerKind::Adam, budget)?;
        let params = ParamSet::he_init(&arch, rng);
        Self::with_params(arch, params, optimizer, budget)
    }

    /// Model starting from existing parameters.
    pub fn with_params(
        arch: Architecture,
        params: ParamSet<f32>,
        optimizer: OptimizerKind,
        budget: usize,
    ) -> TcnResult<Self> {
        arch.validate()?;
        check_params(&arch, &params)?;
        let with_moments = optimizer == OptimizerKind::Adam;
        let required = arch.check_budget(with_moments, budget)?;
        tracing::debug!("Trainable model needs {} of {} budget bytes", required, budget);

        let (c, t, n) = (arch.channels, arch.seq_len, arch.num_classes);
        Ok(Self {
            arch,
            params,
            grads: ParamSet::zeros(&arch),
            moments: with_moments.then(|| AdamMoments::new(&arch)),
            activations: vec![0.0; c * t],
            d_activations: vec![0.0; c * t],
            pooled: vec![0.0; c],
            d_pooled: vec![0.0; c],
            probs: vec![0.0; n],
        })
    }

    /// Training forward pass. Overwrites the stored activations,
    /// pooled values and probabilities, and returns the probabilities.
    pub fn forward(&mut self, input: &[f32]) -> TcnResult<&[f32]> {
        let arch = self.arch;
        check_len(arch.window_len(), input.len())?;
        let t_len = arch.seq_len;

        for c in 0..arch.channels {
            let row = &mut self.activations[c * t_len..(c + 1) * t_len];
            for (t, a) in row.iter_mut().enumerate() {
                *a = leaky_relu(conv_at(
                    &arch,
                    &self.params.tcn_weights,
                    &self.params.tcn_biases,
                    input,
                    c,
                    t,
                ));
            }
            self.pooled[c] = row.iter().sum::<f32>() / t_len as f32;
        }

        dense_forward(
            &self.params.head_weights,
            &self.params.head_biases,
            &self.pooled,
            &mut self.probs,
        );
        softmax_in_place(&mut self.probs);
        Ok(&self.probs)
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    pub fn params(&self) -> &ParamSet<f32> {
        &self.params
    }

    pub fn grads(&self) -> &ParamSet<f32> {
        &self.grads
    }

    pub fn optimizer_kind(&self) -> OptimizerKind {
        if self.moments.is_some() {
            OptimizerKind::Adam
        } else {
            OptimizerKind::Sgd
        }
    }

    /// Bytes this model accounts against the memory budget.
    pub fn memory_bytes(&self) -> usize {
        self.arch.trainable_bytes(self.moments.is_some())
    }
}

// ─── InferenceModel ───────────────────────────────────────────────────────────

/// Read-only model used for serving.
#[derive(Debug, Clone)]
pub struct InferenceModel {
    arch: Architecture,
    params: ParamSet<f32>,
}

impl InferenceModel {
    /// Only the serializer builds inference models, from a decoded blob.
    pub(crate) fn from_params(arch: Architecture, params: ParamSet<f32>) -> TcnResult<Self> {
        arch.validate()?;
        check_params(&arch, &params)?;
        Ok(Self { arch, params })
    }

    /// Lean forward pass writing class probabilities into `probs`.
    pub fn forward(&self, input: &[f32], probs: &mut [f32]) -> TcnResult<()> {
        let arch = &self.arch;
        check_len(arch.window_len(), input.len())?;
        check_len(arch.num_classes, probs.len())?;

        let p = &self.params;
        probs.copy_from_slice(&p.head_biases);

        // Each channel mean feeds straight into the logits
        for c in 0..arch.channels {
            let sum: f32 = (0..arch.seq_len)
                .map(|t| leaky_relu(conv_at(arch, &p.tcn_weights, &p.tcn_biases, input, c, t)))
                .sum();
            let mean = sum / arch.seq_len as f32;
            for (j, logit) in probs.iter_mut().enumerate() {
                *logit += mean * p.head_weights[j * arch.channels + c];
            }
        }

        softmax_in_place(probs);
        Ok(())
    }

    pub fn classify(&self, input: &[f32]) -> TcnResult<Classification> {
        let mut probs = vec![0.0; self.arch.num_classes];
        self.forward(input, &mut probs)?;
        Ok(Classification::from_probabilities(&probs))
    }

    pub fn arch(&self) -> &Architecture {
        &self.arch
    }

    pub fn params(&self) -> &ParamSet<f32> {
        &self.params
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::DEFAULT_MEMORY_BUDGET;
    use rand::{rngs::StdRng, SeedableRng};

    fn small() -> Architecture {
        Architecture::new(3, 8, 4, 3, 3, 2).unwrap()
    }

    fn random_input(arch: &Architecture, rng: &mut StdRng) -> Vec<f32> {
        (0..arch.window_len()).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_zero_model_gives_uniform_distribution() {
        let arch = small();
        let mut model =
            TrainableModel::with_params(arch, ParamSet::zeros(&arch), OptimizerKind::Sgd, DEFAULT_MEMORY_BUDGET)
                .unwrap();
        let probs = model.forward(&vec![0.0; arch.window_len()]).unwrap();
        for &p in probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let arch = small();
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = TrainableModel::new(arch, OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        let input = random_input(&arch, &mut rng);
        let probs = model.forward(&input).unwrap();
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_wrong_input_length_is_rejected() {
        let arch = small();
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = TrainableModel::new(arch, OptimizerKind::Sgd, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        let err = model.forward(&[0.0; 5]).unwrap_err();
        assert!(matches!(err, TcnError::DimensionMismatch { expected: 24, actual: 5 }));
    }

    #[test]
    fn test_budget_is_enforced_at_construction() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = TrainableModel::new(Architecture::default(), OptimizerKind::Adam, 4096, &mut rng).unwrap_err();
        assert!(matches!(err, TcnError::MemoryBudgetExceeded { budget: 4096, .. }));
    }

    #[test]
    fn test_sgd_model_has_no_moments() {
        let arch = small();
        let mut rng = StdRng::seed_from_u64(0);
        let sgd = TrainableModel::new(arch, OptimizerKind::Sgd, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        let adam = TrainableModel::new(arch, OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        assert_eq!(sgd.optimizer_kind(), OptimizerKind::Sgd);
        assert_eq!(adam.optimizer_kind(), OptimizerKind::Adam);
        assert!(sgd.memory_bytes() < adam.memory_bytes());
    }

    #[test]
    fn test_training_and_inference_forward_agree() {
        let arch = small();
        let mut rng = StdRng::seed_from_u64(9);
        let mut model = TrainableModel::new(arch, OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        let lean = InferenceModel::from_params(arch, model.params().clone()).unwrap();

        for _ in 0..5 {
            let input = random_input(&arch, &mut rng);
            let mut lean_probs = vec![0.0; arch.num_classes];
            lean.forward(&input, &mut lean_probs).unwrap();
            let train_probs = model.forward(&input).unwrap();
            for (a, b) in train_probs.iter().zip(&lean_probs) {
                assert!((a - b).abs() < 1e-5, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_inference_output_buffer_must_match_classes() {
        let arch = small();
        let lean = InferenceModel::from_params(arch, ParamSet::zeros(&arch)).unwrap();
        let err = lean.forward(&vec![0.0; arch.window_len()], &mut [0.0; 2]).unwrap_err();
        assert!(matches!(err, TcnError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_loaded_zero_model_gives_uniform_distribution() {
        use crate::ml::serializer::{decode_float, encode_float};

        let arch = small();
        let blob = encode_float(&arch, &ParamSet::zeros(&arch)).unwrap();
        let lean = decode_float(&blob, &arch).unwrap();

        let mut probs = vec![0.0; arch.num_classes];
        lean.forward(&vec![0.0; arch.window_len()], &mut probs).unwrap();
        for &p in &probs {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
        assert_eq!(lean.classify(&vec![0.0; arch.window_len()]).unwrap().class_index, 0);
    }

    #[test]
    fn test_inference_model_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferenceModel>();
    }
}
