//! Store command - classify, link and persist a memory.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use mnemos_memory::RawMemory;
use serde::Serialize;

use super::Context;

/// Arguments for the store command.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Memory content
    pub content: String,

    /// Memory type (e.g. note, task, fact, preference)
    #[arg(short = 't', long = "type", default_value = "note")]
    pub memory_type: String,

    /// Project the memory belongs to
    #[arg(short, long)]
    pub project: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Serialize)]
struct StoredMemory {
    memory_id: String,
    layer: String,
    topic_path: Vec<String>,
    skill_path: Vec<String>,
    emotional_weight: f32,
    connections: usize,
    soft_failures: Vec<mnemos_memory::SoftFailure>,
}

/// Run the store command.
pub async fn run(args: StoreArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;

    let mut raw = RawMemory::new(args.content)
        .with_type(args.memory_type)
        .with_tags(args.tags);
    if let Some(project) = args.project {
        raw = raw.with_project(project);
    }

    let outcome = engine.classify_and_store(raw).await?;
    let id = outcome.value;
    let node = engine.inspect(id)?;
    let connections = engine.connections_of(id)?.len();

    if ctx.json_output {
        return ctx.print_json(&StoredMemory {
            memory_id: id.to_string(),
            layer: node.metadata.layer.to_string(),
            topic_path: node.topic_path,
            skill_path: node.skill_path,
            emotional_weight: node.metadata.emotional_weight,
            connections,
            soft_failures: outcome.soft_failures,
        });
    }

    let dim = Style::new().dim();
    println!("{} {}", style("Stored").green().bold(), style(id).cyan());
    println!("  Layer:        {}", node.metadata.layer);
    if !node.topic_path.is_empty() {
        println!("  Topic:        {}", node.topic_path.join(" > "));
    }
    if !node.skill_path.is_empty() {
        println!("  Skill:        {}", node.skill_path.join(" > "));
    }
    println!("  Weight:       {:.2}", node.metadata.emotional_weight);
    println!("  Connections:  {}", connections);
    println!("{}", dim.apply_to(format!("  Project:      {}", node.project)));
    ctx.report_soft_failures(&outcome.soft_failures);

    Ok(())
}
