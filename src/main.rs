//! Rumbo CLI binary
//! Record → train → evaluate a voice-command classifier.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

mod cli;
use cli::{Cli, Commands};

use rumbo::model::{CommandModel, ModelLoad};
use rumbo::{evaluator, recorder, trainer, RecorderConfig, TrainConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Record => {
            info!("starting recording session...");
            recorder::run(&RecorderConfig::default()).context("recording session failed")
        }
        Commands::Train(args) => {
            info!("training model...");
            let mut cfg = TrainConfig::new(args.dataset_path, args.model_path);
            cfg.epochs = args.epochs;
            let report = trainer::train(&cfg).context("training failed")?;
            info!(
                "trained on {} examples, test accuracy {:.2}",
                report.train_examples, report.test_accuracy
            );
            Ok(())
        }
        Commands::Eval(args) => {
            info!("evaluating {}...", args.test_dir.display());
            let predictions = evaluator::evaluate_dir(&args.model_path, &args.test_dir)
                .context("evaluation failed")?;
            for p in &predictions {
                println!(
                    "file: {}  true label: {}  predicted: {}",
                    p.file, p.true_label, p.predicted
                );
            }
            Ok(())
        }
        Commands::Inspect(args) => inspect(&args),
    }
}

fn inspect(args: &cli::InspectArgs) -> Result<()> {
    let model = CommandModel::load_from_file(&args.model_path)
        .with_context(|| format!("failed to load {}", args.model_path.display()))?;

    println!("model: {}", args.model_path.display());
    println!("  version: {}", model.version());
    println!("  labels: {:?}", model.labels);
    println!(
        "  grid: {} frames x {} coefficients",
        model.grid_size.0, model.grid_size.1
    );
    println!("  weights:");
    for (name, tensor) in &model.weights {
        println!(
            "    {name}: dims {:?}, dtype {}, {} bytes",
            tensor.dims,
            tensor.d_type,
            tensor.bytes.len()
        );
    }
    Ok(())
}
