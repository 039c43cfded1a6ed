//! Maintain command - run one layer/decay maintenance pass.
//!
//! The pass runs on the blocking pool. Ctrl-C cancels it between nodes and
//! prints the checkpoint to resume from.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use tokio_util::sync::CancellationToken;

use super::{Context, heading};

/// Arguments for the maintain command.
#[derive(Args, Debug)]
pub struct MaintainArgs {
    /// Resume from a checkpoint printed by an interrupted pass
    #[arg(long, default_value = "0")]
    pub from: usize,
}

/// Run the maintain command.
pub async fn run(args: MaintainArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    let token = CancellationToken::new();

    let interrupt = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let report = engine.spawn_maintenance(args.from, token).await?;
    watcher.abort();

    if ctx.json_output {
        return ctx.print_json(&report);
    }

    let dim = Style::new().dim();
    heading("Maintenance");
    println!("  Processed:      {}", style(report.processed).cyan());
    println!("  State changes:  {}", report.state_changes);
    println!("  Promotions:     {}", report.promotions);
    println!("  Pruned edges:   {}", report.pruned_connections);
    if !report.soft_failures.is_empty() {
        println!(
            "  Failures:       {}",
            Style::new().yellow().apply_to(report.soft_failures.len())
        );
    }
    if let Some(checkpoint) = report.checkpoint {
        println!();
        println!(
            "{}",
            dim.apply_to(format!(
                "Interrupted. Resume with `mnemos maintain --from {checkpoint}`"
            ))
        );
    }
    ctx.report_soft_failures(&report.soft_failures);
    Ok(())
}
