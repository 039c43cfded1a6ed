//! Trace command - shortest connection path between concepts or memories.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use mnemos_memory::{MemoryEngine, MemoryId};

use super::{Context, heading, parse_id, truncate};

/// Arguments for the trace command.
#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Start concept (a search query, or a memory ID with --ids)
    pub from: String,

    /// End concept (a search query, or a memory ID with --ids)
    pub to: String,

    /// Treat FROM and TO as memory IDs instead of queries
    #[arg(long)]
    pub ids: bool,

    /// Only search this project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Maximum number of edges in the path
    #[arg(long, default_value = "5")]
    pub max_hops: usize,
}

/// Run the trace command.
pub async fn run(args: TraceArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;

    let (from, to, path, failures) = if args.ids {
        let from = vec![parse_id(&args.from)?];
        let to = vec![parse_id(&args.to)?];
        let path = engine.trace_path(&from, &to, args.max_hops);
        (from, to, path, Vec::new())
    } else {
        let outcome = engine
            .trace_concepts(&args.from, &args.to, args.project.as_deref(), args.max_hops)
            .await;
        let trace = outcome.value;
        (
            trace.from_candidates,
            trace.to_candidates,
            trace.path,
            outcome.soft_failures,
        )
    };

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "from_candidates": from,
            "to_candidates": to,
            "path": path,
            "soft_failures": failures,
        }));
    }

    let dim = Style::new().dim();
    match path {
        Some(path) => {
            heading(&format!("Path ({} hops)", path.len().saturating_sub(1)));
            print_path(&engine, &path);
        }
        None => {
            println!(
                "{}",
                dim.apply_to(format!(
                    "No path within {} hops ({} start candidates, {} end candidates)",
                    args.max_hops,
                    from.len(),
                    to.len()
                ))
            );
        }
    }
    ctx.report_soft_failures(&failures);
    Ok(())
}

fn print_path(engine: &MemoryEngine, path: &[MemoryId]) {
    let dim = Style::new().dim();
    for (i, id) in path.iter().enumerate() {
        let preview = engine
            .inspect(*id)
            .map(|node| truncate(&node.content, 60))
            .unwrap_or_default();
        let marker = if i == 0 { " " } else { "→" };
        println!("  {} {} {}", marker, style(preview).cyan(), dim.apply_to(id));
    }
}
