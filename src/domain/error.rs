// ============================================================
// Layer 3 — Engine Errors
// ============================================================
// Every fallible operation in the model-and-training engine
// returns `TcnResult<T>`. The application and CLI layers wrap
// these in `anyhow::Error`, so callers that care about a
// specific failure can still `downcast_ref::<TcnError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// All failure conditions raised by the core engine.
#[derive(Debug, Error)]
pub enum TcnError {
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("label {label} is out of range for {num_classes} classes")]
    InvalidLabel { label: usize, num_classes: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("model needs {required} bytes but the memory budget is {budget} bytes")]
    MemoryBudgetExceeded { required: usize, budget: usize },

    #[error("no valid sequences found under '{}'", .0.display())]
    NoData(PathBuf),

    #[error("failed to allocate {requested} values for the dataset")]
    AllocationFailed { requested: usize },

    #[error("architecture mismatch in '{field}': reader expects {expected}, file holds {found}")]
    ArchitectureMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unrecognised model file: expected magic {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("model blob truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("model blob has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

pub type TcnResult<T> = Result<T, TcnError>;
