// ============================================================
// Layer 2 — QuantizeUseCase
// ============================================================
// Turns a trained float model into its int8 deployment form:
//
//   Step 1: Read model.bin (header checked against the
//           expected architecture)              (Layer 6 - infra)
//   Step 2: Quantize every tensor               (Layer 5 - ml)
//   Step 3: Write model_q8.bin                  (Layer 6 - infra)
//   Step 4: Report sizes and rounding error
//
// The quantized file only measures deployment size; nothing in
// this system loads it back.

use anyhow::Result;
use std::path::PathBuf;

use crate::domain::architecture::Architecture;
use crate::infra::checkpoint::{read_inference_model, write_quantized_model};
use crate::ml::quantizer::QuantizedModel;

#[derive(Debug, Clone)]
pub struct QuantizeReport {
    pub params:          usize,
    pub float_bytes:     usize,
    /// Size of the written file, header included
    pub quantized_bytes: usize,
    pub max_abs_error:   f32,
    /// Parameters outside [−1, 1] that were clipped
    pub saturated:       usize,
}

pub struct QuantizeUseCase {
    input:        PathBuf,
    output:       PathBuf,
    architecture: Architecture,
}

impl QuantizeUseCase {
    pub fn new(input: PathBuf, output: PathBuf, architecture: Architecture) -> Self {
        Self { input, output, architecture }
    }

    pub fn execute(&self) -> Result<QuantizeReport> {
        let model = read_inference_model(&self.input, &self.architecture)?;
        let quantized = QuantizedModel::from_float(self.architecture, model.params());

        let saturated = model.params().values().filter(|v| v.abs() > 1.0).count();
        if saturated > 0 {
            tracing::warn!("{} parameters lie outside [-1, 1] and were saturated", saturated);
        }

        let quantized_bytes = write_quantized_model(&self.output, &quantized)?;
        tracing::info!("Quantized model written to '{}'", self.output.display());

        Ok(QuantizeReport {
            params: self.architecture.param_count(),
            float_bytes: self.architecture.inference_bytes(),
            quantized_bytes,
            max_abs_error: quantized.max_abs_error(model.params()),
            saturated,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::architecture::DEFAULT_MEMORY_BUDGET;
    use crate::infra::checkpoint::write_float_model;
    use crate::ml::model::TrainableModel;
    use crate::ml::optimizer::OptimizerKind;
    use crate::ml::quantizer::QUANT_SCALE;
    use crate::ml::serializer::{HEADER_LEN, QUANT_MAGIC};
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;

    #[test]
    fn test_quantize_writes_int8_blob() {
        let dir = tempfile::tempdir().unwrap();
        let arch = Architecture::new(4, 6, 3, 3, 2, 1).unwrap();
        let model =
            TrainableModel::new(arch, OptimizerKind::Sgd, DEFAULT_MEMORY_BUDGET, &mut StdRng::seed_from_u64(8)).unwrap();
        let input = dir.path().join("model.bin");
        let output = dir.path().join("model_q8.bin");
        write_float_model(&input, &model).unwrap();

        let report = QuantizeUseCase::new(input, output.clone(), arch).execute().unwrap();

        assert_eq!(report.params, arch.param_count());
        assert_eq!(report.float_bytes, 4 * arch.param_count());
        assert_eq!(report.quantized_bytes, HEADER_LEN + arch.param_count());
        assert!(report.max_abs_error <= 0.5 / QUANT_SCALE + 1e-6);

        let blob = fs::read(&output).unwrap();
        assert_eq!(&blob[..4], &QUANT_MAGIC);
        assert_eq!(blob.len(), report.quantized_bytes);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let uc = QuantizeUseCase::new(dir.path().join("nope.bin"), dir.path().join("out.bin"), Architecture::default());
        assert!(uc.execute().is_err());
    }
}
