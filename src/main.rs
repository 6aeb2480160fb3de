use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sensorwatch::{Config, FsStore, Logger, Pipeline, config::Overrides};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file.
    #[arg(long, env = "SENSORWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct OverrideArgs {
    /// Directory holding one sub-directory per bucket.
    #[arg(long, env = "STORE_ROOT")]
    store_root: Option<PathBuf>,

    #[arg(long, env = "S3_BUCKET_NAME")]
    bucket: Option<String>,

    #[arg(long, env = "TRAIN_DATA_INPUT")]
    train_input: Option<String>,

    #[arg(long, env = "TRAIN_DATA_CLEAN")]
    train_clean: Option<String>,

    #[arg(long, env = "TEST_DATA_INPUT")]
    test_input: Option<String>,

    #[arg(long, env = "TEST_DATA_CLEAN")]
    test_clean: Option<String>,

    #[arg(long, env = "TEST_DATA_ANOMALIES")]
    test_anomalies: Option<String>,

    /// Row count (e.g. `2`) or time span (e.g. `2min`).
    #[arg(long, env = "WINDOW_SIZE")]
    window_size: Option<String>,

    #[arg(long, env = "THRESHOLD_MULTIPLIER")]
    threshold_multiplier: Option<f64>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            store_root: args.store_root,
            bucket: args.bucket,
            train_input: args.train_input,
            train_clean: args.train_clean,
            test_input: args.test_input,
            test_clean: args.test_clean,
            test_anomalies: args.test_anomalies,
            window_size: args.window_size,
            threshold_multiplier: args.threshold_multiplier,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fill missing readings of the training (and test) datasets.
    Clean,

    /// Flag test readings outside the training baseline.
    Detect,

    /// Clean, then detect.
    Run,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = Config::resolve(args.config.as_deref(), args.overrides.into())
        .context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    let store = FsStore::new(&cfg.storage.root);
    let pipeline = Pipeline::new(cfg, store, Logger::new(log::logger(), "sensorwatch"));

    match args.command {
        Command::Clean => pipeline.clean_data()?,
        Command::Detect => {
            let n_anomalies = pipeline.detect_anomalies()?;
            log::info!("found {n_anomalies} anomalies");
        }
        Command::Run => {
            let n_anomalies = pipeline.run_all()?;
            log::info!("found {n_anomalies} anomalies");
        }
    }

    Ok(())
}
