//! Promote command - mark memories as actively used.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use mnemos_memory::MemoryLayer;

use super::{Context, parse_id};

/// Arguments for the promote command.
#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Memory IDs
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Move the memories to this layer
    /// (short_term, long_term, episodic, procedural, semantic)
    #[arg(short, long)]
    pub layer: Option<MemoryLayer>,

    /// Set the emotional weight (clamped to 0..1)
    #[arg(short, long)]
    pub weight: Option<f32>,
}

/// Run the promote command.
pub async fn run(args: PromoteArgs, ctx: &Context) -> Result<()> {
    let ids = args
        .ids
        .iter()
        .map(|s| parse_id(s))
        .collect::<Result<Vec<_>>>()?;
    let engine = ctx.open_engine()?;
    let outcome = engine.promote_memories(&ids, args.layer, args.weight);
    let report = outcome.value;

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "promoted": report.promoted,
            "missing": report.missing,
            "soft_failures": outcome.soft_failures,
        }));
    }

    println!(
        "{} {} memor{}",
        style("Promoted").green().bold(),
        report.promoted.len(),
        if report.promoted.len() == 1 { "y" } else { "ies" }
    );
    let red = Style::new().red();
    for id in &report.missing {
        println!("  {} {}", red.apply_to("not found:"), id);
    }
    ctx.report_soft_failures(&outcome.soft_failures);
    Ok(())
}
