//! Transaction Risk Analyzer - Main Entry Point
//!
//! Reads a transaction log, builds per-customer risk features and labels,
//! and writes the outputs handed to model training.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use transaction_risk_analyzer::{
    config::{AppConfig, LoggingConfig},
    models::TrainingSet,
    pipeline::RiskPipeline,
    reader::TransactionReader,
    writer,
};

#[derive(Parser, Debug)]
#[command(name = "risk-analyzer", version, about = "Customer risk features and labels from a transaction log")]
struct Args {
    /// Transaction log (CSV)
    #[arg(short, long)]
    input: PathBuf,

    /// Labeled customer table (CSV)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Customer features without score or label (CSV)
    #[arg(long)]
    features_output: Option<PathBuf>,

    /// Training set for the external model trainer (JSON)
    #[arg(long)]
    training_set: Option<PathBuf>,

    /// Run report (JSON)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Configuration file; defaults to config/config.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override labeling.cutoff_quantile
    #[arg(long)]
    cutoff_quantile: Option<f64>,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!(
            "transaction_risk_analyzer={level},risk_analyzer={level}",
            level = logging.level
        ))
    })?;

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = AppConfig::load_from(args.config.as_deref())?;
    if let Some(q) = args.cutoff_quantile {
        config.labeling.cutoff_quantile = q;
        config.validate()?;
    }

    init_logging(&config.logging)?;
    info!("Starting Transaction Risk Analyzer");
    info!(
        "Rule thresholds: large>{:.0}, very_large>{:.0}, night {}-{}h, cutoff quantile {:.2}",
        config.rules.large_amount_threshold,
        config.rules.very_large_amount_threshold,
        config.rules.night_start_hour,
        config.rules.night_end_hour,
        config.labeling.cutoff_quantile
    );

    let pipeline = RiskPipeline::new(&config)?;
    info!(run_id = %pipeline.metrics().run_id(), "Pipeline ready");

    let transactions = TransactionReader::new(&args.input).read_all()?;

    let features = pipeline.build_features(&transactions)?;
    if let Some(path) = &args.features_output {
        writer::write_file(path, "features", |w| writer::write_features(w, &features))?;
    }

    let outcome = pipeline.label(features);

    // The report is written even when labeling fails
    if let Some(path) = &args.report {
        let report = pipeline.metrics().report();
        writer::write_file(path, "report", |w| writer::write_json(w, &report))?;
    }

    let labeled = match outcome {
        Ok(labeled) => labeled,
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            pipeline.metrics().print_summary();
            return Err(e.into());
        }
    };

    if let Some(path) = &args.output {
        writer::write_file(path, "labels", |w| writer::write_labeled(w, &labeled))?;
    }
    if let Some(path) = &args.training_set {
        let training_set = TrainingSet::from_population(&labeled);
        training_set.ensure_both_classes()?;
        writer::write_file(path, "training set", |w| writer::write_json(w, &training_set))?;
    }

    pipeline.metrics().print_summary();
    info!("Transaction Risk Analyzer finished");
    Ok(())
}
