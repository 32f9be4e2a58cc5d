// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a training run produces.
//
// What gets saved:
//   1. model.bin          — float model blob (header + f32 payload)
//   2. train_config.json  — the full run configuration
//   3. model_q8.bin       — int8 blob, written by `quantize`
//
// Why save the config separately?
//   The model blob header records the architecture, but serving
//   and offline classification also need the gesture names and
//   the architecture to *expect*. Reading the config first lets
//   the loader reject a blob that belongs to a different run.
//
// File naming convention:
//   models/
//     model.bin
//     model_q8.bin
//     train_config.json
//     metrics.csv
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::architecture::Architecture;
use crate::ml::model::{InferenceModel, TrainableModel};
use crate::ml::quantizer::QuantizedModel;
use crate::ml::serializer::{decode_float, encode_float, encode_quantized};

pub const MODEL_FILE: &str = "model.bin";
pub const QUANTIZED_FILE: &str = "model_q8.bin";
pub const CONFIG_FILE: &str = "train_config.json";

/// Manages the files of one checkpoint directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    /// Persist the current parameters of a trainable model.
    pub fn save_model(&self, model: &TrainableModel) -> Result<PathBuf> {
        let path = self.model_path();
        write_float_model(&path, model)?;
        tracing::debug!("Saved model to '{}'", path.display());
        Ok(path)
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);

        // serde_json::to_string_pretty adds indentation for readability
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json).with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        load_config_file(&self.dir.join(CONFIG_FILE))
    }
}

/// Read a `train_config.json` from an explicit path.
pub fn load_config_file(path: &Path) -> Result<TrainConfig> {
    let json = fs::read_to_string(path).with_context(|| {
        format!(
            "Cannot read config from '{}'. Make sure you have run 'train' first.",
            path.display()
        )
    })?;

    serde_json::from_str(&json).with_context(|| format!("Malformed config '{}'", path.display()))
}

/// Write a `TCNF` blob of the model's parameters to `path`.
pub fn write_float_model(path: &Path, model: &TrainableModel) -> Result<()> {
    let blob = encode_float(model.arch(), model.params())?;
    fs::write(path, blob).with_context(|| format!("Cannot write model to '{}'", path.display()))
}

/// Read a `TCNF` blob that must match `arch`.
pub fn read_inference_model(path: &Path, arch: &Architecture) -> Result<InferenceModel> {
    let bytes = fs::read(path).with_context(|| {
        format!("Cannot read model '{}'. Have you trained the model first?", path.display())
    })?;
    decode_float(&bytes, arch).with_context(|| format!("Invalid model file '{}'", path.display()))
}

/// Where `quantize` writes the int8 model by default: next to the float model.
pub fn quantized_path_for(model_path: &Path) -> PathBuf {
    model_path.with_file_name(QUANTIZED_FILE)
}

/// Write a `TCNQ` blob to `path` and return its size in bytes.
pub fn write_quantized_model(path: &Path, model: &QuantizedModel) -> Result<usize> {
    let blob = encode_quantized(model)?;
    fs::write(path, &blob).with_context(|| format!("Cannot write quantized model to '{}'", path.display()))?;
    Ok(blob.len())
}
