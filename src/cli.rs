//! Command line surface.
//!
//! Flag spellings follow the historic scripts (`--dataset_path`,
//! `--model_path`, `--test_dir`); the recorder takes no flags at all.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rumbo::constants::DEFAULT_MODEL_PATH;

/// Voice-command recognizer pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record labeled training samples (fixed vocabulary, no options)
    Record,

    /// Train the classifier and export the quantized artifact
    Train(TrainArgs),

    /// Run the exported artifact against a labeled test tree
    Eval(EvalArgs),

    /// Print artifact metadata
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Dataset root (one subdirectory per label)
    #[arg(long = "dataset_path")]
    pub dataset_path: PathBuf,

    /// Output path for the exported model artifact
    #[arg(long = "model_path")]
    pub model_path: PathBuf,

    /// Number of training epochs
    #[arg(long, default_value_t = rumbo::constants::DEFAULT_EPOCHS)]
    pub epochs: usize,
}

#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// Test tree root (one subdirectory per label)
    #[arg(long = "test_dir")]
    pub test_dir: PathBuf,

    /// Model artifact to load
    #[arg(long = "model_path", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Model artifact to inspect
    pub model_path: PathBuf,
}
