//! Start command - runs the subscriber engine until interrupted.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use super::Context;
use crate::engine::Engine;

/// Arguments for the start command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Seconds between session summaries in the log (0 disables)
    #[arg(long, default_value_t = 300)]
    pub status_interval: u64,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    for path in ctx.loaded.loaded_from() {
        info!(path = %path.display(), "Config loaded");
    }

    let engine = Engine::start(config).await?;
    info!(topic = %engine.topic(), "Subscriber engine running, press Ctrl-C to stop");

    let mut ticker = (args.status_interval > 0)
        .then(|| tokio::time::interval(Duration::from_secs(args.status_interval)));

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            }
            _ = tick(&mut ticker) => log_summary(&engine).await,
        }
    }

    info!("Shutting down");
    engine.shutdown().await;
    Ok(())
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn log_summary(engine: &Engine) {
    match engine.manager.get_stats().await {
        Ok(stats) => info!(
            total = stats.total,
            ipoe_v4 = stats.ipoe_v4,
            ipoe_v6 = stats.ipoe_v6,
            ppp = stats.ppp,
            active = stats.active,
            timers = engine.expiry.pending(),
            "Session summary"
        ),
        Err(e) => warn!(error = %e, "Failed to collect session stats"),
    }
}
