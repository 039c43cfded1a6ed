//! Get command - show one memory and count the read.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, heading, parse_id};

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Memory ID
    pub id: String,

    /// Also list outgoing connections
    #[arg(short, long)]
    pub connections: bool,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.open_engine()?;
    let outcome = engine.get_memory(id)?;
    let mut node = outcome.value;
    let connections = if args.connections {
        engine.connections_of(id)?
    } else {
        Vec::new()
    };

    if ctx.json_output {
        // vectors are noise in scripted output
        node.embedding = None;
        return ctx.print_json(&serde_json::json!({
            "memory": node,
            "connections": connections,
            "soft_failures": outcome.soft_failures,
        }));
    }

    let dim = Style::new().dim();
    let meta = &node.metadata;
    heading(&format!("Memory {}", node.id));
    println!("{}", node.content);
    println!();
    println!("  Type:         {}", node.memory_type);
    println!("  Project:      {}", node.project);
    if !node.tags.is_empty() {
        println!("  Tags:         {}", node.tags.join(", "));
    }
    println!("  Layer:        {}", style(meta.layer).cyan());
    println!("  State:        {}", style(meta.state).cyan());
    if !node.topic_path.is_empty() {
        println!("  Topic:        {}", node.topic_path.join(" > "));
    }
    if !node.skill_path.is_empty() {
        println!("  Skill:        {}", node.skill_path.join(" > "));
    }
    println!("  Weight:       {:.2}", meta.emotional_weight);
    println!("  Integration:  {:.2}", meta.integration_depth);
    println!("  Accesses:     {}", meta.access_count);
    println!(
        "  Connections:  {} ({:.2} total strength)",
        meta.connected_count, meta.connection_strength_total
    );
    println!(
        "{}",
        dim.apply_to(format!(
            "  Created {}, last accessed {}",
            meta.created_at.format("%Y-%m-%d %H:%M"),
            meta.last_accessed.format("%Y-%m-%d %H:%M")
        ))
    );

    if !connections.is_empty() {
        println!();
        for conn in &connections {
            println!(
                "  → {} {} {}",
                style(conn.target).cyan(),
                conn.connection_type,
                dim.apply_to(format!("({:.2})", conn.strength))
            );
        }
    }
    ctx.report_soft_failures(&outcome.soft_failures);

    Ok(())
}
