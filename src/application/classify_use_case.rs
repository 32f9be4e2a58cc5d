// ============================================================
// Layer 2 — ClassifyUseCase
// ============================================================
// Offline check of a trained model against one recording:
//
//   Step 1: Read train_config.json  → architecture + gesture names
//   Step 2: Read model.bin          → InferenceModel
//   Step 3: Read the recording, keep its last T frames
//   Step 4: Classify and map the class index to a gesture name

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::data::loader::read_frames;
use crate::domain::sample::Classification;
use crate::infra::checkpoint::{load_config_file, read_inference_model, CONFIG_FILE, MODEL_FILE};

#[derive(Debug, Clone)]
pub struct ClassifyOutcome {
    pub gesture:        String,
    pub classification: Classification,
}

pub struct ClassifyUseCase {
    checkpoint_dir: PathBuf,
}

impl ClassifyUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into() }
    }

    pub fn execute(&self, recording: &Path) -> Result<ClassifyOutcome> {
        let cfg  = load_config_file(&self.checkpoint_dir.join(CONFIG_FILE))?;
        let arch = cfg.architecture;
        let model = read_inference_model(&self.checkpoint_dir.join(MODEL_FILE), &arch)?;

        let frames = read_frames(recording, arch.features)?;
        let frame_count = frames.len() / arch.features;
        if frame_count < arch.seq_len {
            bail!(
                "'{}' has {} frames but the model needs {}",
                recording.display(),
                frame_count,
                arch.seq_len
            );
        }
        let window = &frames[(frame_count - arch.seq_len) * arch.features..];
        tracing::debug!("Classifying frames {}..{} of '{}'", frame_count - arch.seq_len, frame_count, recording.display());

        let classification = model.classify(window)?;
        let gesture = cfg
            .gestures
            .get(classification.class_index)
            .cloned()
            .unwrap_or_else(|| format!("class {}", classification.class_index));

        Ok(ClassifyOutcome { gesture, classification })
    }
}
