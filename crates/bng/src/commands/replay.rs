//! Replay command - drives the engine from a file of lifecycle events.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use bng_subscriber::{ProcessOutcome, SessionFilter, SessionStats};
use bng_types::{LifecycleEvent, SubscriberSession};
use clap::Args;
use serde::Serialize;
use tracing::warn;

use super::Context;
use crate::engine::Engine;

/// Arguments for the replay command.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file of lifecycle events (blank lines and `#` comments
    /// are ignored)
    pub file: PathBuf,

    /// List the stored sessions after replay
    #[arg(short, long)]
    pub list: bool,

    /// Terminate a session after replay (repeatable)
    #[arg(long = "terminate", value_name = "SESSION_ID")]
    pub terminate: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
struct ReplaySummary {
    events: usize,
    activated: usize,
    released: usize,
    replicated: usize,
    rejected: usize,
    terminated: Vec<String>,
    stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    sessions: Option<Vec<SubscriberSession>>,
}

/// Parse a JSON-lines event file.
fn parse_events(contents: &str) -> Result<Vec<LifecycleEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid event on line {}", n + 1))
        })
        .collect()
}

/// Run the replay command.
pub async fn run(args: ReplayArgs, ctx: &Context) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let events = parse_events(&contents)?;

    let engine = Engine::start(&ctx.loaded.config).await?;
    let mut summary = ReplaySummary {
        events: events.len(),
        ..Default::default()
    };

    for event in &events {
        match engine.manager.process(event).await {
            Ok(ProcessOutcome::Activated) => summary.activated += 1,
            Ok(ProcessOutcome::Released) => summary.released += 1,
            Ok(ProcessOutcome::Replicated) => summary.replicated += 1,
            Err(e) => {
                warn!(session_id = %event.session_id, error = %e, "Event rejected");
                summary.rejected += 1;
            }
        }
    }

    for session_id in &args.terminate {
        match engine.manager.terminate_session(session_id).await {
            Ok(_) => summary.terminated.push(session_id.clone()),
            Err(e) => warn!(session_id = %session_id, error = %e, "Terminate failed"),
        }
    }

    summary.stats = engine.manager.get_stats().await?;
    if args.list {
        summary.sessions = Some(engine.manager.get_sessions(&SessionFilter::new()).await?);
    }

    engine.shutdown().await;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ReplaySummary) {
    println!(
        "Replayed {} event(s): {} activated, {} released, {} replicated, {} rejected",
        summary.events, summary.activated, summary.released, summary.replicated, summary.rejected
    );
    if !summary.terminated.is_empty() {
        println!("Terminated: {}", summary.terminated.join(", "));
    }

    println!();
    println!("Sessions:");
    for (name, count) in summary.stats.to_map() {
        println!("  {:<10} {}", name, count);
    }

    if let Some(sessions) = &summary.sessions {
        println!();
        println!(
            "  {:<20} {:<12} {:<18} {:>5} {:>5} {:<15}",
            "ID", "KIND", "MAC", "SVLAN", "CVLAN", "IPV4"
        );
        for session in sessions {
            println!(
                "  {:<20} {:<12} {:<18} {:>5} {:>5} {:<15}",
                session.session_id(),
                session.kind().to_string(),
                session.mac(),
                session.outer_vlan(),
                session.inner_vlan().unwrap_or(0),
                session
                    .ipv4_address()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }
}
