// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported:
//   1. `train`    — trains the TCN on gesture recordings
//   2. `quantize` — writes the int8 version of a trained model
//   3. `serve`    — answers classification requests over TCP
//   4. `classify` — classifies one recording offline
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ArchArgs, ClassifyArgs, Commands, QuantizeArgs, ServeArgs, TrainArgs};
use std::path::Path;

use crate::application::train_use_case::DEFAULT_GESTURES;
use crate::domain::architecture::Architecture;
use crate::infra::checkpoint::load_config_file;

/// Top-level parser; clap derives the argument handling.
#[derive(Parser, Debug)]
#[command(
    name = "gesture-tcn",
    version,
    about = "Train, quantize and serve a small temporal convolutional gesture classifier."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Quantize(args) => run_quantize(args),
            Commands::Serve(args)    => run_serve(args),
            Commands::Classify(args) => run_classify(args),
        }
    }
}

/// Architecture from a saved config when given, otherwise from the flags.
fn resolve_architecture(config: Option<&Path>, arch: &ArchArgs) -> Result<Architecture> {
    match config {
        Some(path) => Ok(load_config_file(path)?.architecture),
        None => Ok(arch.architecture(DEFAULT_GESTURES.len())),
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on recordings in: {}", args.data_dir);

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete on {} windows.", summary.windows);
    if let Some(m) = &summary.final_epoch {
        print!("Final epoch {}: loss {:.4}, accuracy {:.1}%", m.epoch, m.train_loss, m.train_acc * 100.0);
        if let (Some(vl), Some(va)) = (m.val_loss, m.val_acc) {
            print!(", val loss {:.4}, val accuracy {:.1}%", vl, va * 100.0);
        }
        println!();
    }
    println!("Model saved to {} ({} bytes of parameters).", summary.model_path.display(), summary.model_bytes);
    Ok(())
}

/// Handles the `quantize` subcommand.
fn run_quantize(args: QuantizeArgs) -> Result<()> {
    use crate::application::quantize_use_case::QuantizeUseCase;

    let arch = resolve_architecture(args.config.as_deref(), &args.arch)?;
    let output = args.output_path();
    let report = QuantizeUseCase::new(args.input, output.clone(), arch).execute()?;

    println!("Quantized {} parameters into {}", report.params, output.display());
    println!(
        "  int8 model: {} bytes ({:.2} KB), float parameters: {} bytes",
        report.quantized_bytes,
        report.quantized_bytes as f64 / 1024.0,
        report.float_bytes,
    );
    println!("  max rounding error: {:.6} ({} saturated)", report.max_abs_error, report.saturated);
    Ok(())
}

/// Handles the `serve` subcommand. Blocks until the connection
/// limit is reached, or forever without one.
fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::application::serve_use_case::{ServeConfig, ServeUseCase};

    let architecture = resolve_architecture(args.config.as_deref(), &args.arch)?;
    architecture.validate()?;

    ServeUseCase::new(ServeConfig {
        addr: args.addr,
        model_path: args.model,
        architecture,
        wire: args.wire.into(),
        max_connections: args.max_connections,
    })
    .execute()
}

/// Handles the `classify` subcommand.
fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifyUseCase;

    let outcome = ClassifyUseCase::new(&args.checkpoint_dir).execute(&args.recording)?;
    println!(
        "{}: {} (class {}, confidence {:.4})",
        args.recording.display(),
        outcome.gesture,
        outcome.classification.class_index,
        outcome.classification.confidence,
    );
    Ok(())
}
