//! Insights command - distributions, growth and recommendations.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, heading};

/// Arguments for the insights command.
#[derive(Args, Debug)]
pub struct InsightsArgs {
    /// Only report on this project
    #[arg(short, long)]
    pub project: Option<String>,
}

/// Run the insights command.
pub async fn run(args: InsightsArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;
    let report = engine.insights(args.project.as_deref());

    if ctx.json_output {
        return ctx.print_json(&report);
    }

    let dim = Style::new().dim();
    let title = match &report.project {
        Some(project) => format!("Insights: {project}"),
        None => "Insights".to_string(),
    };
    heading(&title);
    println!("  Memories:     {}", style(report.total_memories).cyan());
    println!("  Connections:  {}", style(report.total_connections).cyan());
    println!("  Avg weight:   {:.2}", report.average_emotional_weight);
    println!();

    println!("{}", style("Layers").bold());
    for (layer, count) in &report.layer_distribution {
        println!("  {:<12} {}", layer.as_str(), count);
    }
    println!("{}", style("States").bold());
    for (state, count) in &report.state_distribution {
        println!("  {:<12} {}", state.as_str(), count);
    }
    if !report.top_topics.is_empty() {
        println!("{}", style("Top topics").bold());
        for (topic, count) in &report.top_topics {
            println!("  {:<20} {}", topic, count);
        }
    }
    if !report.top_skills.is_empty() {
        println!("{}", style("Top skills").bold());
        for (skill, count) in &report.top_skills {
            println!("  {:<20} {}", skill, count);
        }
    }
    if !report.connection_types.is_empty() {
        println!("{}", style("Connection types").bold());
        for (ty, count) in &report.connection_types {
            println!("  {:<12} {}", ty.as_str(), count);
        }
    }

    if report.recommendations.is_empty() {
        println!();
        println!("{}", dim.apply_to("No recommendations"));
    } else {
        println!();
        println!("{}", style("Recommendations").bold());
        for recommendation in &report.recommendations {
            println!("  {} {}", Style::new().yellow().apply_to("•"), recommendation);
        }
    }
    Ok(())
}
