//! Related command - memories reachable over strong connections.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, heading, parse_id, truncate};

/// Arguments for the related command.
#[derive(Args, Debug)]
pub struct RelatedArgs {
    /// Memory ID to start from
    pub id: String,

    /// Maximum suggestions
    #[arg(short, long, default_value = "5")]
    pub limit: usize,
}

/// Run the related command.
pub async fn run(args: RelatedArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.open_engine()?;
    let related = engine.suggest_related(id, args.limit)?;

    if ctx.json_output {
        return ctx.print_json(&related);
    }

    let dim = Style::new().dim();
    if related.is_empty() {
        println!("{}", dim.apply_to("No related memories"));
        return Ok(());
    }
    heading("Related Memories");
    for memory in &related {
        println!(
            "  {} {}",
            style(format!("{:.3}", memory.score)).cyan(),
            truncate(&memory.content, 60)
        );
        println!("        {}", dim.apply_to(format!("{} · {}", memory.layer, memory.memory_id)));
    }
    Ok(())
}
