//! Graph command - knowledge graph around a topic.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, heading};

/// Arguments for the graph command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Center topic
    pub topic: String,

    /// Only include this project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Maximum number of nodes
    #[arg(long, default_value = "20")]
    pub max_nodes: usize,
}

/// Run the graph command.
pub async fn run(args: GraphArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    let outcome = engine
        .knowledge_graph(&args.topic, args.project.as_deref(), args.max_nodes)
        .await?;
    let graph = outcome.value;

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "graph": graph,
            "soft_failures": outcome.soft_failures,
        }));
    }

    let dim = Style::new().dim();
    heading(&format!("Knowledge graph: {}", graph.center_topic));
    if graph.nodes.is_empty() {
        println!("{}", dim.apply_to("No matching memories"));
        return Ok(());
    }
    for (layer, ids) in &graph.layers {
        println!("{} {}", style(layer).bold(), dim.apply_to(format!("({})", ids.len())));
        for node in graph.nodes.iter().filter(|n| n.layer == *layer) {
            println!("  {} {}", style(&node.preview).cyan(), dim.apply_to(node.id));
            if !node.topics.is_empty() {
                println!("    {}", dim.apply_to(node.topics.join(", ")));
            }
        }
    }
    println!();
    println!("{}", style("Edges").bold());
    for edge in &graph.edges {
        println!(
            "  {} → {} {} {}",
            edge.source,
            edge.target,
            edge.connection_type,
            dim.apply_to(format!("({:.2})", edge.strength))
        );
    }
    ctx.report_soft_failures(&outcome.soft_failures);
    Ok(())
}
