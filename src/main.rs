//! cardinal-train - train an estimation model from query execution logs

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use cardinal::{Result, TargetKind, Trainer, TrainerConfig, TrainingReport};

/// Train a learned cardinality or selectivity model.
#[derive(Parser, Debug)]
#[command(name = "cardinal-train", version, about, long_about = None)]
struct Args {
    /// Newline-delimited JSON log of executed queries.
    #[arg(long, value_name = "FILE")]
    log_file: PathBuf,

    /// Where to write the trained model.
    #[arg(long, value_name = "FILE", default_value = "filter_selectivity_model.json")]
    output_model: PathBuf,

    /// Fraction of records held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Minimum valid records required to train.
    #[arg(long, default_value_t = 1000)]
    min_samples: usize,

    /// What the model predicts (selectivity or cardinality).
    #[arg(long, default_value = "selectivity")]
    target: TargetKind,

    /// Seed for the train/test split and tree sampling.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match run(&args) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Training failed: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<TrainingReport> {
    let config = TrainerConfig::new(args.target)
        .with_min_samples(args.min_samples)
        .with_test_fraction(args.test_size)
        .with_seed(args.seed);
    Trainer::new(config).train_from_log(&args.log_file, &args.output_model)
}

fn print_summary(report: &TrainingReport) {
    println!("Training complete ({} model)", report.target);
    println!(
        "  records: {} used, {} skipped",
        report.records_loaded, report.records_skipped
    );
    println!(
        "  split:   {} train / {} test",
        report.train_samples, report.test_samples
    );

    let space = match report.target {
        TargetKind::Cardinality => " (log space)",
        TargetKind::Selectivity => "",
    };
    println!("\nHeld-out metrics{space}:");
    println!("  MAE:  {:.4}", report.metrics.mae);
    println!("  RMSE: {:.4}", report.metrics.rmse);
    println!("  R²:   {:.4}", report.metrics.r2);
    if report.meets_accuracy_target == Some(false) {
        println!("  warning: MAE is above the accuracy target");
    }

    println!("\nTop features:");
    for (rank, entry) in report.feature_importance.iter().take(10).enumerate() {
        println!("  {:>2}. {:<32} {:.4}", rank + 1, entry.feature, entry.importance);
    }

    if let Some(path) = &report.model_path {
        println!("\nModel written to {}", path.display());
        println!("To deploy:");
        println!("  1. Copy the model next to the serving process");
        println!(
            "  2. Load it with Estimator::open(EstimatorConfig::default(), Path::new(\"{}\"))",
            path.display()
        );
        println!("  3. Swap in retrained models with Estimator::load_model without a restart");
    }
}
