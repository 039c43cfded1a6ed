//! Search command - ranked multi-strategy search.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use mnemos_memory::QueryContext;

use super::{Context, heading, truncate};

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Only search this project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Required tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Intent label, e.g. debugging, optimization, learning
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Maximum results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Ignore emotional weight when matching and ranking
    #[arg(long)]
    pub no_emotional: bool,

    /// Do not boost recently accessed memories
    #[arg(long)]
    pub no_recency: bool,

    /// Also report topics shared by several results
    #[arg(long)]
    pub patterns: bool,
}

/// Run the search command.
pub async fn run(args: SearchArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.open_engine()?;

    let mut query = QueryContext::new(args.query.as_str())
        .with_tags(args.tags)
        .with_max_results(args.limit)
        .with_emotional(!args.no_emotional)
        .with_recency_boost(!args.no_recency);
    if let Some(project) = args.project {
        query = query.with_project(project);
    }
    if let Some(goal) = args.goal {
        query = query.with_goal(goal);
    }

    let dim = Style::new().dim();
    if ctx.verbose && !ctx.json_output {
        println!(
            "{}",
            dim.apply_to(format!("Searching: \"{}\" (limit: {})", args.query, args.limit))
        );
        println!();
    }

    let outcome = engine.search(&query).await;
    let results = outcome.value.results;
    let patterns = if args.patterns {
        engine.analogical_patterns(&results)
    } else {
        Vec::new()
    };

    if ctx.json_output {
        return ctx.print_json(&serde_json::json!({
            "results": results,
            "patterns": patterns,
            "soft_failures": outcome.soft_failures,
        }));
    }

    if results.is_empty() {
        println!("{}", dim.apply_to("No results found"));
    } else {
        heading("Search Results");
        println!();
        for (i, result) in results.iter().enumerate() {
            println!("{}. {}", style(i + 1).cyan(), truncate(&result.content, 70));
            let matched: Vec<&str> = result.matched_by.iter().map(|m| m.as_str()).collect();
            println!(
                "   {}",
                dim.apply_to(format!(
                    "score {:.3} · {} · {} · {} · {}",
                    result.score,
                    matched.join("+"),
                    result.layer,
                    result.project,
                    result.memory_id
                ))
            );
            println!();
        }
    }

    if !patterns.is_empty() {
        heading("Shared Topics");
        for pattern in &patterns {
            println!(
                "  {} {}",
                style(&pattern.topic).cyan(),
                dim.apply_to(format!("({} results)", pattern.memory_ids.len()))
            );
        }
    }
    ctx.report_soft_failures(&outcome.soft_failures);

    Ok(())
}
