// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Load sliding windows            (Layer 4 - data)
//   Step 3: Build the trainable model       (Layer 5 - ml)
//           (fails here if it exceeds the memory budget)
//   Step 4: Save config + open metrics log  (Layer 6 - infra)
//   Step 5: Run the training loop           (Layer 5 - ml)
//   Step 6: Save the float model            (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::loader::{GestureDirLoader, DEFAULT_STRIDE};
use crate::domain::architecture::{Architecture, DEFAULT_MEMORY_BUDGET};
use crate::domain::traits::WindowSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::TrainableModel;
use crate::ml::optimizer::{OptimizerConfig, OptimizerKind};
use crate::ml::trainer::{Trainer, DEFAULT_LOG_EVERY};

/// The three gestures of the default recording set, in label order.
pub const DEFAULT_GESTURES: [&str; 3] = ["wave", "swipe_left", "swipe_right"];

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the model so serving and offline classification
// rebuild exactly the same architecture and gesture names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:            String,
    pub checkpoint_dir:      String,
    /// Gesture directory names; position = class label
    pub gestures:            Vec<String>,
    pub architecture:        Architecture,
    pub epochs:              usize,
    pub learning_rate:       f32,
    pub optimizer:           OptimizerKind,
    pub stride:              usize,
    pub validation_fraction: f32,
    /// Simulated SRAM limit in bytes
    pub memory_budget:       usize,
    pub seed:                u64,
    pub log_every:           usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:            "models/data".to_string(),
            checkpoint_dir:      "models".to_string(),
            gestures:            DEFAULT_GESTURES.iter().map(|g| g.to_string()).collect(),
            architecture:        Architecture::default(),
            epochs:              200,
            learning_rate:       1e-3,
            optimizer:           OptimizerKind::Adam,
            stride:              DEFAULT_STRIDE,
            validation_fraction: 0.2,
            memory_budget:       DEFAULT_MEMORY_BUDGET,
            seed:                42,
            log_every:           DEFAULT_LOG_EVERY,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        self.architecture.validate()?;
        if self.architecture.num_classes != self.gestures.len() {
            bail!(
                "architecture has {} classes but {} gestures are configured",
                self.architecture.num_classes,
                self.gestures.len()
            );
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            bail!("validation fraction must be in [0, 1), got {}", self.validation_fraction);
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            bail!("learning rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub windows:      usize,
    pub model_bytes:  usize,
    pub model_path:   PathBuf,
    pub final_epoch:  Option<EpochMetrics>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        let arch = cfg.architecture;

        // ── Step 2: Load windows ──────────────────────────────────────────────
        tracing::info!("Loading recordings from '{}'", cfg.data_dir);
        let loader      = GestureDirLoader::new(&cfg.data_dir, cfg.gestures.clone(), arch, cfg.stride);
        let mut dataset = loader.load_windows()?;
        for (gesture, count) in cfg.gestures.iter().zip(dataset.class_counts(arch.num_classes)) {
            tracing::info!("  {:<14} {} windows", gesture, count);
        }

        // ── Step 3: Build model ───────────────────────────────────────────────
        let mut rng   = StdRng::seed_from_u64(cfg.seed);
        let mut model = TrainableModel::new(arch, cfg.optimizer, cfg.memory_budget, &mut rng)?;
        tracing::info!(
            "Model ready: {} parameters, {} / {} budget bytes, receptive field {} frames",
            arch.param_count(),
            model.memory_bytes(),
            cfg.memory_budget,
            arch.receptive_field(),
        );

        // ── Step 4: Persist config, open metrics ──────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(ckpt.dir())?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let trainer = Trainer {
            optimizer:           OptimizerConfig::new(cfg.optimizer, cfg.learning_rate),
            epochs:              cfg.epochs,
            validation_fraction: cfg.validation_fraction,
            log_every:           cfg.log_every,
        };
        let mut best_val_loss = f64::INFINITY;
        let history = trainer.train(&mut model, &mut dataset, &mut rng, |m| {
            metrics.log(m)?;
            if m.is_improvement(best_val_loss) {
                best_val_loss = m.val_loss.unwrap_or(best_val_loss);
                tracing::debug!("Epoch {}: new best validation loss {:.4}", m.epoch, best_val_loss);
            }
            Ok(())
        })?;

        // ── Step 6: Save model ────────────────────────────────────────────────
        let model_path = ckpt.save_model(&model)?;
        tracing::info!("Model saved to '{}'", model_path.display());

        Ok(TrainSummary {
            windows:     dataset.len(),
            model_bytes: arch.inference_bytes(),
            model_path,
            final_epoch: history.last().cloned(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::{read_inference_model, MODEL_FILE};
    use crate::infra::metrics::METRICS_FILE;
    use std::{fs, path::Path};

    fn write_recording(path: &Path, frames: usize, level: f32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let rows: Vec<String> = (0..frames).map(|i| format!("{},{}", level, level + i as f32 * 0.01)).collect();
        fs::write(path, rows.join("\n")).unwrap();
    }

    fn small_config(root: &Path) -> TrainConfig {
        TrainConfig {
            data_dir:       root.join("data").display().to_string(),
            checkpoint_dir: root.join("ckpt").display().to_string(),
            gestures:       vec!["up".into(), "down".into()],
            architecture:   Architecture::new(2, 4, 3, 2, 2, 1).unwrap(),
            epochs:         3,
            learning_rate:  0.01,
            stride:         2,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_end_to_end_training_writes_artifacts() {
        let root = tempfile::tempdir().unwrap();
        write_recording(&root.path().join("data/up/a.csv"), 12, 0.5);
        write_recording(&root.path().join("data/down/a.csv"), 12, -0.5);
        let cfg = small_config(root.path());

        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();

        // (12 - 4) / 2 + 1 = 5 windows per gesture
        assert_eq!(summary.windows, 10);
        assert_eq!(summary.final_epoch.as_ref().map(|m| m.epoch), Some(3));

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
        assert!(read_inference_model(&ckpt.dir().join(MODEL_FILE), &cfg.architecture).is_ok());

        let csv = fs::read_to_string(ckpt.dir().join(METRICS_FILE)).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_class_count_must_match_gestures() {
        let root = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { gestures: vec!["only".into()], ..small_config(root.path()) };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_budget_violation_fails_before_training() {
        let root = tempfile::tempdir().unwrap();
        write_recording(&root.path().join("data/up/a.csv"), 12, 0.5);
        let cfg = TrainConfig { memory_budget: 64, ..small_config(root.path()) };

        let err = TrainUseCase::new(cfg.clone()).execute().unwrap_err();
        assert!(err.to_string().contains("memory budget"));
        assert!(!Path::new(&cfg.checkpoint_dir).join(MODEL_FILE).exists());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }
}
