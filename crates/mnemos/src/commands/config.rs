//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use mnemos_config::MnemosConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML (the default)
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Print the resolved database path
    Db,

    /// Write a config file filled with the defaults
    Init {
        /// Create project-local config (./mnemos.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Db => {
            println!("{}", ctx.database_path().display());
            Ok(())
        }
        ConfigCommand::Init { local } => cmd_init(ctx, local),
    }
}

/// Every section filled in, so the output doubles as a template.
fn effective(config: &MnemosConfig) -> MnemosConfig {
    MnemosConfig {
        storage: Some(config.storage.clone().unwrap_or_default()),
        embedding: Some(config.embedding()),
        engine: Some(config.engine()),
        query: Some(config.query()),
        logging: Some(config.logging()),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = effective(&ctx.config.config);
    if ctx.json_output {
        return ctx.print_json(&config);
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.config;
    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        return ctx.print_json(&sources);
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found (using defaults).");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }
    for warning in &loaded.warnings {
        println!("  ⚠ {}", warning);
    }
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("mnemos.toml")
    } else {
        ctx.config_dir
            .as_ref()
            .map(|dir| dir.join("config.toml"))
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
    };

    let created = !path.exists();
    if created {
        mnemos_config::save_config(&effective(&MnemosConfig::new()), &path)?;
    }

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({ "path": path, "created": created }));
    }
    if created {
        println!("Created config file: {}", path.display());
    } else {
        println!("Config file already exists: {}", path.display());
    }
    Ok(())
}
