// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands: `train`, `quantize`, `serve`
// and `classify`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f32, enums, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::serve_use_case::DEFAULT_ADDR;
use crate::application::train_use_case::{TrainConfig, DEFAULT_GESTURES};
use crate::data::loader::DEFAULT_STRIDE;
use crate::domain::architecture::{Architecture, DEFAULT_MEMORY_BUDGET};
use crate::infra::checkpoint::quantized_path_for;
use crate::infra::wire::WireFormat;
use crate::ml::optimizer::OptimizerKind;
use crate::ml::trainer::DEFAULT_LOG_EVERY;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the gesture TCN on per-gesture CSV recordings
    Train(TrainArgs),

    /// Convert a trained float model into an int8 model
    Quantize(QuantizeArgs),

    /// Serve classifications over TCP
    Serve(ServeArgs),

    /// Classify the last window of one recording
    Classify(ClassifyArgs),
}

/// Network shape, shared by every command that builds or reads a model.
#[derive(Args, Debug, Clone)]
pub struct ArchArgs {
    /// Values per frame (landmarks × coordinates)
    #[arg(long, default_value_t = 60)]
    pub features: usize,

    /// Frames per window
    #[arg(long, default_value_t = 100)]
    pub seq_len: usize,

    /// Convolution output channels
    #[arg(long, default_value_t = 16)]
    pub channels: usize,

    /// Convolution kernel taps
    #[arg(long, default_value_t = 3)]
    pub kernel_size: usize,

    /// Spacing between kernel taps
    #[arg(long, default_value_t = 1)]
    pub dilation: usize,

    /// Number of classes (defaults to the number of gestures)
    #[arg(long)]
    pub num_classes: Option<usize>,
}

impl ArchArgs {
    /// Unvalidated architecture; every consumer validates it.
    pub fn architecture(&self, default_classes: usize) -> Architecture {
        Architecture {
            features:    self.features,
            seq_len:     self.seq_len,
            channels:    self.channels,
            kernel_size: self.kernel_size,
            num_classes: self.num_classes.unwrap_or(default_classes),
            dilation:    self.dilation,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerArg {
    /// Plain stochastic gradient descent
    Sgd,
    /// Bias-corrected Adam
    Adam,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(a: OptimizerArg) -> Self {
        match a {
            OptimizerArg::Sgd => OptimizerKind::Sgd,
            OptimizerArg::Adam => OptimizerKind::Adam,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireArg {
    /// u32 big-endian length prefix + big-endian f32 values
    Binary,
    /// Legacy: one comma-separated line per window
    Text,
}

impl From<WireArg> for WireFormat {
    fn from(a: WireArg) -> Self {
        match a {
            WireArg::Binary => WireFormat::Binary,
            WireArg::Text => WireFormat::Text,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with one sub-directory of .csv recordings per gesture
    #[arg(long, default_value = "models/data")]
    pub data_dir: String,

    /// Directory to save model.bin, train_config.json and metrics.csv
    #[arg(long, default_value = "models")]
    pub checkpoint_dir: String,

    /// Gesture names in label order, comma separated
    #[arg(long, value_delimiter = ',', default_values = DEFAULT_GESTURES)]
    pub gestures: Vec<String>,

    #[command(flatten)]
    pub arch: ArchArgs,

    /// Number of full passes through the training windows
    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    /// Step size of the update rule
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f32,

    #[arg(long, value_enum, default_value_t = OptimizerArg::Adam)]
    pub optimizer: OptimizerArg,

    /// Frames between consecutive window starts
    #[arg(long, default_value_t = DEFAULT_STRIDE)]
    pub stride: usize,

    /// Fraction of windows held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_fraction: f32,

    /// Simulated SRAM budget in bytes
    #[arg(long, default_value_t = DEFAULT_MEMORY_BUDGET)]
    pub memory_budget: usize,

    /// Seed for initialisation, splitting and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log progress every N epochs
    #[arg(long, default_value_t = DEFAULT_LOG_EVERY)]
    pub log_every: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let architecture = a.arch.architecture(a.gestures.len());
        TrainConfig {
            data_dir:            a.data_dir,
            checkpoint_dir:      a.checkpoint_dir,
            gestures:            a.gestures,
            architecture,
            epochs:              a.epochs,
            learning_rate:       a.lr,
            optimizer:           a.optimizer.into(),
            stride:              a.stride,
            validation_fraction: a.validation_fraction,
            memory_budget:       a.memory_budget,
            seed:                a.seed,
            log_every:           a.log_every,
        }
    }
}

/// All arguments for the `quantize` command
#[derive(Args, Debug)]
pub struct QuantizeArgs {
    /// Float model written by `train`
    #[arg(long, default_value = "models/model.bin")]
    pub input: PathBuf,

    /// Destination of the int8 model (defaults to model_q8.bin beside the input)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Take the architecture from this train_config.json instead of the flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub arch: ArchArgs,
}

impl QuantizeArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| quantized_path_for(&self.input))
    }
}

/// All arguments for the `serve` command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Float model to serve; the server still starts if it is missing
    #[arg(long, default_value = "models/model.bin")]
    pub model: PathBuf,

    /// Request framing
    #[arg(long, value_enum, default_value_t = WireArg::Binary)]
    pub wire: WireArg,

    /// Take the architecture from this train_config.json instead of the flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Exit after this many connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    #[command(flatten)]
    pub arch: ArchArgs,
}

/// All arguments for the `classify` command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// CSV recording to classify (its last window is used)
    pub recording: PathBuf,

    /// Directory where `train` saved the model and its config
    #[arg(long, default_value = "models")]
    pub checkpoint_dir: PathBuf,
}
