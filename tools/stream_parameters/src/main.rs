/// Stream parameters tool: derives segment routing, reach numbers, lake links
/// and basins for a model grid, then exports and runs the Cascade Routing Tool.
///
/// Usage: stream_parameters -i project.json [--skip-crt] [--log-level debug]
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use streamnet_core::pipeline::{self, RunOptions};
use streamnet_core::StreamConfig;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "stream_parameters",
    about = "Compute stream network parameters and Cascade Routing Tool inputs"
)]
struct Args {
    /// Project configuration file (JSON)
    #[arg(short, long)]
    ini: PathBuf,

    /// Debug level logging (same as --log-level debug)
    #[arg(long)]
    debug: bool,

    /// Logging level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Export CRT inputs without running the tool
    #[arg(long)]
    skip_crt: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Args {
    fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::from(self.log_level)
        }
    }

    /// Default filter directive; `RUST_LOG` takes precedence when set.
    fn directive(&self) -> String {
        self.level().as_str().to_ascii_lowercase()
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.directive())),
        )
        .with_target(false)
        .init();

    info!("GSFLOW Stream Parameters: {}", args.ini.display());
    let config = StreamConfig::load(&args.ini)
        .with_context(|| format!("Cannot load configuration {}", args.ini.display()))?;

    let summary = pipeline::run(&config, &RunOptions { skip_crt: args.skip_crt })
        .with_context(|| format!("Stream parameters failed for {}", config.cells_path.display()))?;

    info!(
        "{} cells, {} stream segments, {} lakes, {} pour points",
        summary.cells, summary.stream_segments, summary.lake_segments, summary.pour_points
    );
    for path in &summary.files_written {
        info!("  wrote {}", path.display());
    }
    Ok(())
}
