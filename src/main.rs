//! GPU Signal Tracker — command line entrypoint.
//!
//! `fetch` → `classify` → `brief <daily|weekly>` → `plot`, or all of them via `run`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gpu_signal_tracker::config::ENV_CONFIG_PATH;
use gpu_signal_tracker::{pipeline, Mode, PipelineConfig};

#[derive(Parser)]
#[command(name = "gpu-signal-tracker", version, about = "GPU/AI market news signals and briefings")]
struct Cli {
    /// Pipeline config file (defaults to config/pipeline.toml when present)
    #[arg(long, global = true, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch feeds, tag headlines and write signals.csv
    Fetch,
    /// Classify 'other' headlines and write signals_ai.csv
    Classify,
    /// Compose a briefing over the last day or week
    Brief {
        /// daily or weekly
        #[arg(value_parser = parse_mode)]
        mode: Mode,
    },
    /// Write the weighted tag chart for the last 7 days
    Plot,
    /// Every stage in order
    Run,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse::<Mode>().map_err(|e| e.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gpu_signal_tracker=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let cfg = match path {
        Some(p) => {
            if !p.exists() {
                return Err(gpu_signal_tracker::ConfigError::MissingFile(p).into());
            }
            PipelineConfig::load_from(&p)?
        }
        None => PipelineConfig::load_default()?,
    };
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(cli.config)?;

    match cli.command {
        Command::Fetch => {
            let report = pipeline::fetch_stage(&cfg).await?;
            info!(rows = report.records.len(), "fetch done");
        }
        Command::Classify => {
            let stats = pipeline::classify_stage(&cfg).await?;
            info!(
                candidates = stats.candidates,
                promoted = stats.promoted,
                failures = stats.failures,
                "classify done"
            );
        }
        Command::Brief { mode } => {
            if let Some(path) = pipeline::brief_stage(&cfg, mode).await? {
                println!("{}", path.display());
            }
        }
        Command::Plot => {
            let path = pipeline::plot_stage(&cfg)?;
            println!("{}", path.display());
        }
        Command::Run => pipeline::run_all(&cfg).await?,
    }
    Ok(())
}
