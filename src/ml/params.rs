// ============================================================
// Layer 5 — Parameter Sets
// ============================================================
// The four tensors of the network, always in the same order:
//
//   tcn_weights   [C][F][K]   index c·F·K + cin·K + k
//   tcn_biases    [C]
//   head_weights  [N][C]      index j·C + i
//   head_biases   [N]
//
// The same container holds parameters, gradients and both Adam
// moments (f32), and the quantized weights (i8). That order is
// also the serialization order, so `values()` is exactly the
// payload of a model file.
//
// He initialisation (He et al., 2015):
//   w ~ Normal(0, sqrt(2 / fan_in))
//   fan_in = F·K for the convolution, C for the dense head

use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::architecture::Architecture;
use crate::domain::error::{TcnError, TcnResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSet<T> {
    pub tcn_weights: Vec<T>,
    pub tcn_biases: Vec<T>,
    pub head_weights: Vec<T>,
    pub head_biases: Vec<T>,
}

impl<T: Copy + Default> ParamSet<T> {
    /// All four tensors sized for `arch` and filled with `T::default()`.
    pub fn zeros(arch: &Architecture) -> Self {
        Self {
            tcn_weights: vec![T::default(); arch.tcn_weight_count()],
            tcn_biases: vec![T::default(); arch.tcn_bias_count()],
            head_weights: vec![T::default(); arch.head_weight_count()],
            head_biases: vec![T::default(); arch.head_bias_count()],
        }
    }

    /// Split one flat buffer (serialization order) into the four tensors.
    pub fn from_flat(arch: &Architecture, mut flat: Vec<T>) -> TcnResult<Self> {
        if flat.len() != arch.param_count() {
            return Err(TcnError::DimensionMismatch { expected: arch.param_count(), actual: flat.len() });
        }
        // Peel tensors off the back so each split_off is a single copy
        let head_biases = flat.split_off(flat.len() - arch.head_bias_count());
        let head_weights = flat.split_off(flat.len() - arch.head_weight_count());
        let tcn_biases = flat.split_off(flat.len() - arch.tcn_bias_count());
        Ok(Self { tcn_weights: flat, tcn_biases, head_weights, head_biases })
    }
}

impl<T> ParamSet<T> {
    /// The four tensors in serialization order.
    pub fn tensors(&self) -> [&[T]; 4] {
        [&self.tcn_weights, &self.tcn_biases, &self.head_weights, &self.head_biases]
    }

    pub fn tensors_mut(&mut self) -> [&mut [T]; 4] {
        [
            &mut self.tcn_weights,
            &mut self.tcn_biases,
            &mut self.head_weights,
            &mut self.head_biases,
        ]
    }

    /// Every value, in serialization order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.tensors().into_iter().flat_map(|t| t.iter())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.tensors_mut().into_iter().flat_map(IntoIterator::into_iter)
    }

    pub fn len(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }

    /// Apply `f` element-wise, keeping the tensor layout.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> ParamSet<U> {
        ParamSet {
            tcn_weights: self.tcn_weights.iter().map(&mut f).collect(),
            tcn_biases: self.tcn_biases.iter().map(&mut f).collect(),
            head_weights: self.head_weights.iter().map(&mut f).collect(),
            head_biases: self.head_biases.iter().map(&mut f).collect(),
        }
    }
}

impl ParamSet<f32> {
    /// He-initialised weights, zero biases.
    pub fn he_init<R: Rng + ?Sized>(arch: &Architecture, rng: &mut R) -> Self {
        let mut params = Self::zeros(arch);
        let tcn_std = (2.0 / (arch.features * arch.kernel_size) as f32).sqrt();
        let head_std = (2.0 / arch.channels as f32).sqrt();

        for w in &mut params.tcn_weights {
            *w = rng.sample::<f32, _>(StandardNormal) * tcn_std;
        }
        for w in &mut params.head_weights {
            *w = rng.sample::<f32, _>(StandardNormal) * head_std;
        }
        params
    }

    pub fn fill(&mut self, value: f32) {
        self.values_mut().for_each(|v| *v = value);
    }

    /// L2 norm over all four tensors together.
    pub fn l2_norm(&self) -> f32 {
        self.values().map(|v| v * v).sum::<f32>().sqrt()
    }

    pub fn scale(&mut self, factor: f32) {
        self.values_mut().for_each(|v| *v *= factor);
    }
}
