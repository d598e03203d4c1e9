//! Forge CLI - inspect and verify training checkpoints
//!
//! Provides a `forge` command for looking inside checkpoint directories
//! written by `forge_training::System::save_state`.

mod commands;

use clap::{Parser, Subcommand};
use commands::verify::ModelSpec;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Forge CLI - training checkpoint tooling
#[derive(Parser, Debug)]
#[command(name = "forge", author, version, about = "Forge - training checkpoint tooling")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the saved system state and a summary overview
    Inspect {
        /// Checkpoint directory
        dir: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a checkpoint holds every artifact needed to restore it
    ///
    /// Exits non-zero when any file is missing.
    Verify {
        /// Checkpoint directory
        dir: PathBuf,

        /// Model to check, as NAME:BACKEND (e.g. encoder:burn). Repeatable.
        #[arg(long = "model", value_name = "NAME:BACKEND")]
        models: Vec<ModelSpec>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Inspect { dir, json } => commands::inspect::execute(&dir, json),
        Command::Verify { dir, models } => commands::verify::execute(&dir, &models),
    }
}
