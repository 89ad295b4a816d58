//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./bng.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    if ctx.json_output {
        let resolved = serde_json::json!({
            "sources": loaded.loaded_from(),
            "warnings": loaded.warnings,
            "subscriber": config.subscriber(),
            "qos": config.qos(),
            "cache": config.cache(),
            "srg": config.srg(),
            "dataplane": config.dataplane(),
            "logging": config.logging(),
        });
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!("# BNG Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let subscriber = config.subscriber();
    println!("Subscriber:");
    println!("  topic: {}", subscriber.topic);
    println!("  scan page size: {}", subscriber.scan_page_size);
    println!();

    let qos = config.qos();
    println!("QoS:");
    println!("  input: {}", qos.input_class);
    println!("  output: {}", qos.output_class);
    println!();

    let srg = config.srg();
    if srg.enabled {
        println!("Redundancy groups:");
        for group in &srg.groups {
            let svlans: Vec<String> = group.svlans.iter().map(u16::to_string).collect();
            println!("  {:<4} {:?}  svlans {}", group.id, group.role, svlans.join(","));
        }
    } else {
        println!("Redundancy: disabled (single node)");
    }
    println!();

    let dataplane = config.dataplane();
    if !dataplane.interfaces.is_empty() {
        println!("Interfaces:");
        for (name, index) in &dataplane.interfaces {
            println!("  {:<16} {}", name, index);
        }
        println!();
    }

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ! {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    println!("Config file search order (later overrides earlier):\n");

    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = ctx.loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'bng config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("bng.toml")
    } else {
        bng_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    bng_config::save_config(&bng_config::BngConfig::with_defaults(), &path)?;
    println!("Created {}", path.display());
    Ok(())
}

fn cmd_path() -> Result<()> {
    match bng_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("Could not determine config directory"),
    }
    Ok(())
}
