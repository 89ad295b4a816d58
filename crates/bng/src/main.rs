//! BNG subscriber control plane.
//!
//! Main entry point for the `bng` daemon and CLI.

use std::path::PathBuf;

use anyhow::Result;
use bng_config::LoggingSection;
use clap::{Parser, Subcommand};
use tracing::warn;

mod commands;
mod engine;

use commands::{config, replay, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// BNG subscriber control plane - session lifecycle engine
#[derive(Parser)]
#[command(name = "bng")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file layered over the discovered ones
    #[arg(short, long, global = true, env = "BNG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the subscriber engine until interrupted
    Start(start::StartArgs),

    /// Feed lifecycle events from a file through the engine and report
    Replay(replay::ReplayArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = bng_config::load_config(None, cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|l| l.config.logging())
        .unwrap_or_default();
    let _guard = init_tracing(&logging, cli.verbose);

    let loaded = loaded?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Replay(args) => replay::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console (human-readable, stderr) plus daily-rolling JSON file.
fn init_tracing(
    logging: &LoggingSection,
    verbose: bool,
) -> tracing_appender::non_blocking::WorkerGuard {
    let console_filter = match (&logging.console_filter, verbose) {
        (_, true) => {
            "bng=debug,bng_subscriber=debug,bng_runtime=debug,bng_cache=debug,bng_config=debug,info"
                .to_string()
        }
        (Some(filter), false) => filter.clone(),
        (None, false) => "bng=info,bng_subscriber=info,bng_runtime=info,warn".to_string(),
    };
    let file_filter = logging.file_filter.clone().unwrap_or_else(|| {
        "bng=trace,bng_subscriber=trace,bng_runtime=debug,bng_cache=debug,bng_config=debug,info"
            .to_string()
    });

    let log_dir = logging.directory.clone().unwrap_or_else(|| {
        bng_config::xdg_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    });
    let file_appender = tracing_appender::rolling::daily(&log_dir, "bng.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(console_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(file_filter)),
        )
        .init();

    guard
}
