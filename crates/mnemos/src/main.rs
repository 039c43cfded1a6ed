//! Mnemos - layered, graph-connected memory engine
//!
//! Main entry point for the Mnemos CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use mnemos_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{
    config, get, graph, insights, maintain, promote, related, search, store, trace,
};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Mnemos - layered, graph-connected memory engine
#[derive(Parser)]
#[command(name = "mnemos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// SQLite database path (default: from config, then the data directory)
    #[arg(long, global = true, env = "MNEMOS_DB")]
    pub db: Option<PathBuf>,

    /// User config directory (default: $MNEMOS_CONFIG_DIR or ~/.config/mnemos)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify, link and store a new memory
    Store(store::StoreArgs),

    /// Show a memory (counts as a read)
    Get(get::GetArgs),

    /// Ranked multi-strategy search
    Search(search::SearchArgs),

    /// Suggest memories related to one memory
    Related(related::RelatedArgs),

    /// Trace a path between two concepts or memories
    Trace(trace::TraceArgs),

    /// Mark memories as actively used
    Promote(promote::PromoteArgs),

    /// Run a layer/decay maintenance pass
    Maintain(maintain::MaintainArgs),

    /// Aggregate statistics and recommendations
    Insights(insights::InsightsArgs),

    /// Knowledge graph around a topic
    Graph(graph::GraphArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = mnemos_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let config_dir = cli
        .config_dir
        .clone()
        .or_else(mnemos_config::xdg_config_dir);

    // Console (human-readable, stderr) + daily rolling JSON file
    let _guard = init_tracing(cli.verbose, &loaded.config.logging(), config_dir.as_deref());
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    loaded.config.validate()?;

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        db_path: cli.db,
        config_dir,
        config: loaded,
    };

    match cli.command {
        Commands::Store(args) => store::run(args, &ctx).await,
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Search(args) => search::run(args, &ctx).await,
        Commands::Related(args) => related::run(args, &ctx).await,
        Commands::Trace(args) => trace::run(args, &ctx).await,
        Commands::Promote(args) => promote::run(args, &ctx).await,
        Commands::Maintain(args) => maintain::run(args, &ctx).await,
        Commands::Insights(args) => insights::run(args, &ctx).await,
        Commands::Graph(args) => graph::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

fn init_tracing(
    verbose: bool,
    logging: &LoggingConfig,
    config_dir: Option<&Path>,
) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let console_filter = if verbose {
        "mnemos=debug,mnemos_memory=debug,mnemos_embed=debug,mnemos_config=debug,info"
    } else {
        "mnemos=info,warn"
    };
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(console_filter));

    let mut guard = None;
    let file = if logging.file {
        let log_dir = logging
            .directory
            .clone()
            .or_else(|| config_dir.map(|d| d.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"));
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("mnemos.log")
            .build(&log_dir)
            .ok()
            .map(|appender| {
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                let filter = EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(&logging.level));
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(filter)
            })
    } else {
        None
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}
