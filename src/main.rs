use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use augur::{Interpretation, Pipeline, PipelineConfig, TrainingReport};

#[derive(Parser)]
#[command(name = "augur")]
#[command(about = "Random-forest regression with model-agnostic interpretation reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Log errors only
    #[arg(long, global = true)]
    quiet: bool,

    /// Worker threads for fitting and interpretation (default: one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input and output locations, overriding the configuration file.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory receiving the model, JSON results and plots
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Prefix for every output file; letters, digits, _ and - only
    #[arg(long)]
    experiment: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: train, interpret and render
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Train and save the model without interpreting it
    Tune {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Interpret a saved model on the held-out split
    Explain {
        #[command(flatten)]
        args: RunArgs,

        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,
    },

    /// Print the default configuration as TOML
    InitConfig,
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainingOutput {
    experiment: String,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    best_index: usize,
    best_params: String,
    cv_mean_mse: f64,
    oob_r2: Option<f64>,
    test_mse: f64,
    test_r2: f64,
    report: PathBuf,
    model: PathBuf,
}

#[derive(Serialize)]
struct InterpretationOutput {
    top_features: Vec<String>,
    surrogate_r2: f64,
    lime_row: usize,
    report: PathBuf,
    plots: Vec<PathBuf>,
}

#[derive(Serialize)]
struct RunOutput {
    training: TrainingOutput,
    interpretation: InterpretationOutput,
}

fn training_output(report: &TrainingReport, report_path: PathBuf, model_path: PathBuf) -> TrainingOutput {
    TrainingOutput {
        experiment: report.experiment.clone(),
        n_train: report.n_train,
        n_test: report.n_test,
        n_features: report.feature_names.len(),
        best_index: report.best_index,
        best_params: report.best_params.to_string(),
        cv_mean_mse: report.grid[report.best_index].mean_mse,
        oob_r2: report.oob.as_ref().map(|s| s.r2),
        test_mse: report.test.mse,
        test_r2: report.test.r2,
        report: report_path,
        model: model_path,
    }
}

fn interpretation_output(
    interpretation: &Interpretation,
    report_path: PathBuf,
    plots: Vec<PathBuf>,
) -> InterpretationOutput {
    InterpretationOutput {
        top_features: interpretation
            .importance
            .features
            .iter()
            .take(10)
            .map(|f| f.feature.clone())
            .collect(),
        surrogate_r2: interpretation.surrogate.r_squared,
        lime_row: interpretation.lime.instance_index,
        report: report_path,
        plots,
    }
}

fn load_config(path: Option<&PathBuf>, args: RunArgs) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok(config.with_overrides(args.data, args.output_dir, args.experiment))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Run { args } => {
            let config = load_config(cli.config.as_ref(), args)?;
            let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
            let outcome = pipeline
                .run()
                .map_err(|e| {
                    let stage = e.stage();
                    anyhow::Error::new(e).context(format!("pipeline failed at stage {stage}"))
                })?;

            let output = RunOutput {
                training: training_output(
                    &outcome.tune.report,
                    outcome.tune.report_path,
                    outcome.tune.model_path,
                ),
                interpretation: interpretation_output(
                    &outcome.interpretation,
                    outcome.interpretation_path,
                    outcome.plots,
                ),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tune { args } => {
            let config = load_config(cli.config.as_ref(), args)?;
            let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
            let outcome = pipeline.tune().map_err(|e| {
                let stage = e.stage();
                anyhow::Error::new(e).context(format!("tuning failed at stage {stage}"))
            })?;

            let output = training_output(&outcome.report, outcome.report_path, outcome.model_path);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Explain { args, model } => {
            let config = load_config(cli.config.as_ref(), args)?;
            let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
            let outcome = pipeline.explain(&model).map_err(|e| {
                let stage = e.stage();
                anyhow::Error::new(e).context(format!("explain failed at stage {stage}"))
            })?;

            let output =
                interpretation_output(&outcome.interpretation, outcome.interpretation_path, outcome.plots);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::InitConfig => {
            let config = match cli.config.as_ref() {
                Some(path) => PipelineConfig::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            print!("{}", config.to_toml().context("failed to encode configuration")?);
        }
    }

    Ok(())
}
