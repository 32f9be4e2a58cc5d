// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Plain per-sample stochastic training (batch size 1):
//
//   for each epoch:
//     shuffle the training order
//     for each training window:
//       forward → loss → backward → clip + update
//     evaluate the held-out windows (if any)
//     report EpochMetrics
//
// Shuffling:
//   - Without a validation split the dataset itself is shuffled
//     (windows and labels together) every epoch.
//   - With a split, only the training index list is shuffled so
//     the validation windows stay fixed for the whole run.
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use rand::{seq::SliceRandom, Rng};

use crate::data::dataset::WindowDataset;
use crate::data::splitter::split_indices;
use crate::domain::error::{TcnError, TcnResult};
use crate::domain::sample::Classification;
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::TrainableModel;
use crate::ml::ops::cross_entropy;
use crate::ml::optimizer::{self, OptimizerConfig};

/// Default interval (in epochs) between progress log lines.
pub const DEFAULT_LOG_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct Trainer {
    pub optimizer: OptimizerConfig,
    pub epochs: usize,
    /// Fraction of windows held out for validation, in `[0, 1)`
    pub validation_fraction: f32,
    pub log_every: usize,
}

impl Trainer {
    /// Train `model` on `dataset`, calling `on_epoch` after every epoch.
    pub fn train<R, F>(
        &self,
        model: &mut TrainableModel,
        dataset: &mut WindowDataset,
        rng: &mut R,
        mut on_epoch: F,
    ) -> Result<Vec<EpochMetrics>>
    where
        R: Rng + ?Sized,
        F: FnMut(&EpochMetrics) -> Result<()>,
    {
        if dataset.window_len() != model.arch().window_len() {
            return Err(TcnError::DimensionMismatch {
                expected: model.arch().window_len(),
                actual: dataset.window_len(),
            }
            .into());
        }
        if model.optimizer_kind() != self.optimizer.kind {
            bail!(
                "model was built for {:?} but the optimizer is configured for {:?}",
                model.optimizer_kind(),
                self.optimizer.kind
            );
        }

        // ── Train / validation partition ──────────────────────────────────────
        let split = split_indices(dataset.len(), 1.0 - self.validation_fraction, rng);
        let mut train_idx = split.train;
        let val_idx = split.validation;
        if train_idx.is_empty() {
            bail!(
                "no training windows: {} windows with validation fraction {}",
                dataset.len(),
                self.validation_fraction
            );
        }
        tracing::info!(
            "Training on {} windows, validating on {} ({} epochs, {:?})",
            train_idx.len(),
            val_idx.len(),
            self.epochs,
            self.optimizer.kind,
        );

        // ── Epoch loop ────────────────────────────────────────────────────────
        let mut history = Vec::with_capacity(self.epochs);
        for epoch in 1..=self.epochs {
            if val_idx.is_empty() {
                dataset.shuffle(rng);
            } else {
                train_idx.shuffle(rng);
            }

            let mut loss_sum = 0.0f64;
            let mut correct  = 0usize;
            for &i in &train_idx {
                let sample = dataset.sample(i);
                let probs = model.forward(sample.frames)?;
                loss_sum += cross_entropy(probs, sample.label) as f64;
                if Classification::from_probabilities(probs).class_index == sample.label {
                    correct += 1;
                }
                model.backward(sample.frames, sample.label)?;
                optimizer::step(model, &self.optimizer)?;
            }

            let (val_loss, val_acc) = if val_idx.is_empty() {
                (None, None)
            } else {
                let (loss, acc) = evaluate(model, dataset, &val_idx)?;
                (Some(loss), Some(acc))
            };

            let metrics = EpochMetrics {
                epoch,
                train_loss: loss_sum / train_idx.len() as f64,
                train_acc: correct as f64 / train_idx.len() as f64,
                val_loss,
                val_acc,
            };

            if epoch == 1 || epoch == self.epochs || (self.log_every > 0 && epoch % self.log_every == 0) {
                match (metrics.val_loss, metrics.val_acc) {
                    (Some(vl), Some(va)) => tracing::info!(
                        "Epoch {:>4}/{} | loss={:.4} | acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
                        epoch,
                        self.epochs,
                        metrics.train_loss,
                        metrics.train_acc * 100.0,
                        vl,
                        va * 100.0,
                    ),
                    _ => tracing::info!(
                        "Epoch {:>4}/{} | loss={:.4} | acc={:.1}%",
                        epoch,
                        self.epochs,
                        metrics.train_loss,
                        metrics.train_acc * 100.0,
                    ),
                }
            }

            on_epoch(&metrics)?;
            history.push(metrics);
        }

        tracing::info!("Training complete!");
        Ok(history)
    }
}

/// Average loss and accuracy of `model` over the windows at `indices`.
pub fn evaluate(model: &mut TrainableModel, dataset: &WindowDataset, indices: &[usize]) -> TcnResult<(f64, f64)> {
    if indices.is_empty() {
        return Ok((0.0, 0.0));
    }
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    for &i in indices {
        let sample = dataset.sample(i);
        let probs = model.forward(sample.frames)?;
        loss_sum += cross_entropy(probs, sample.label) as f64;
        if Classification::from_probabilities(probs).class_index == sample.label {
            correct += 1;
        }
    }
    let n = indices.len() as f64;
    Ok((loss_sum / n, correct as f64 / n))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::{Architecture, DEFAULT_MEMORY_BUDGET};
    use crate::ml::optimizer::OptimizerKind;
    use rand::{rngs::StdRng, SeedableRng};

    fn arch() -> Architecture {
        Architecture::new(2, 6, 4, 3, 2, 1).unwrap()
    }

    /// Class 0 hovers around +0.5, class 1 around −0.5.
    fn separable_dataset(n: usize, rng: &mut StdRng) -> WindowDataset {
        let arch = arch();
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let label = i % 2;
            let centre = if label == 0 { 0.5 } else { -0.5 };
            data.extend((0..arch.window_len()).map(|_| centre + rng.gen_range(-0.2..0.2)));
            labels.push(label);
        }
        WindowDataset::from_parts(arch.window_len(), data, labels).unwrap()
    }

    fn trainer(epochs: usize, validation_fraction: f32) -> Trainer {
        Trainer {
            optimizer: OptimizerConfig::adam(0.01),
            epochs,
            validation_fraction,
            log_every: DEFAULT_LOG_EVERY,
        }
    }

    #[test]
    fn test_loss_decreases_on_separable_data() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut dataset = separable_dataset(40, &mut rng);
        let mut model = TrainableModel::new(arch(), OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();

        let history = trainer(15, 0.0).train(&mut model, &mut dataset, &mut rng, |_| Ok(())).unwrap();

        assert_eq!(history.len(), 15);
        let first = history[0].train_loss;
        let last = history[14].train_loss;
        assert!(last < first, "loss did not decrease: {first} → {last}");
        assert!(history.iter().all(|m| m.val_loss.is_none()));
    }

    #[test]
    fn test_validation_split_reports_metrics() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut dataset = separable_dataset(20, &mut rng);
        let mut model = TrainableModel::new(arch(), OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();

        let mut seen = Vec::new();
        let history = trainer(3, 0.25)
            .train(&mut model, &mut dataset, &mut rng, |m| {
                seen.push(m.epoch);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        for m in &history {
            let acc = m.val_acc.unwrap();
            assert!(m.val_loss.unwrap() > 0.0);
            assert!((0.0..=1.0).contains(&acc));
        }
    }

    #[test]
    fn test_everything_held_out_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dataset = separable_dataset(1, &mut rng);
        let mut model = TrainableModel::new(arch(), OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        assert!(trainer(1, 1.0).train(&mut model, &mut dataset, &mut rng, |_| Ok(())).is_err());
    }

    #[test]
    fn test_optimizer_must_match_model() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dataset = separable_dataset(4, &mut rng);
        let mut model = TrainableModel::new(arch(), OptimizerKind::Sgd, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        assert!(trainer(1, 0.0).train(&mut model, &mut dataset, &mut rng, |_| Ok(())).is_err());
    }

    #[test]
    fn test_callback_error_stops_training() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut dataset = separable_dataset(4, &mut rng);
        let mut model = TrainableModel::new(arch(), OptimizerKind::Adam, DEFAULT_MEMORY_BUDGET, &mut rng).unwrap();
        let result = trainer(5, 0.0).train(&mut model, &mut dataset, &mut rng, |m| {
            if m.epoch == 2 {
                anyhow::bail!("disk full");
            }
            Ok(())
        });
        assert!(result.is_err());
    }
}
