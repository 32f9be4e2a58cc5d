// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Wraps an optional InferenceModel behind the Classifier trait.
// A server may start before any model exists; in that state
// every request is answered with the "no model" sentinel
// instead of an error.

use anyhow::Result;
use std::path::Path;

use crate::domain::architecture::Architecture;
use crate::domain::error::TcnResult;
use crate::domain::sample::Classification;
use crate::domain::traits::Classifier;
use crate::infra::checkpoint::read_inference_model;
use crate::ml::model::InferenceModel;

pub struct Inferencer {
    arch: Architecture,
    model: Option<InferenceModel>,
}

impl Inferencer {
    /// An inferencer with no model; every request gets the sentinel.
    pub fn empty(arch: Architecture) -> Self {
        Self { arch, model: None }
    }

    pub fn new(model: InferenceModel) -> Self {
        Self { arch: *model.arch(), model: Some(model) }
    }

    /// Load the float model at `path`, which must match `arch`.
    pub fn from_checkpoint(path: &Path, arch: Architecture) -> Result<Self> {
        let model = read_inference_model(path, &arch)?;
        tracing::info!("Model loaded from '{}' ({} parameters)", path.display(), arch.param_count());
        Ok(Self::new(model))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }
}

impl Classifier for Inferencer {
    fn window_len(&self) -> usize {
        self.arch.window_len()
    }

    fn classify(&self, window: &[f32]) -> TcnResult<Option<Classification>> {
        match &self.model {
            Some(model) => model.classify(window).map(Some),
            None => Ok(None),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::params::ParamSet;

    fn arch() -> Architecture {
        Architecture::new(2, 3, 2, 2, 3, 1).unwrap()
    }

    #[test]
    fn test_empty_inferencer_returns_none() {
        let inf = Inferencer::empty(arch());
        assert!(!inf.is_loaded());
        assert_eq!(inf.window_len(), 6);
        assert_eq!(inf.classify(&[0.0; 6]).unwrap(), None);
    }

    #[test]
    fn test_loaded_inferencer_picks_biased_class() {
        let arch = arch();
        let mut params = ParamSet::zeros(&arch);
        params.head_biases = vec![0.0, 2.0, 0.0];
        let inf = Inferencer::new(InferenceModel::from_params(arch, params).unwrap());

        let c = inf.classify(&[0.0; 6]).unwrap().unwrap();
        assert_eq!(c.class_index, 1);
        assert!(c.confidence > 0.7);
    }

    #[test]
    fn test_wrong_window_length_is_an_error() {
        let arch = arch();
        let inf = Inferencer::new(InferenceModel::from_params(arch, ParamSet::zeros(&arch)).unwrap());
        assert!(inf.classify(&[0.0; 4]).is_err());
    }
}
