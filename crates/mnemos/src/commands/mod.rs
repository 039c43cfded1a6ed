//! CLI command handlers.

pub mod config;
pub mod get;
pub mod graph;
pub mod insights;
pub mod maintain;
pub mod promote;
pub mod related;
pub mod search;
pub mod store;
pub mod trace;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use mnemos_config::{EmbeddingConfig, EmbeddingProvider, LoadedConfig};
use mnemos_embed::{EmbedderSpec, SharedEmbedder};
use mnemos_memory::{EngineSettings, MemoryEngine, MemoryId, SoftFailure, SqliteRecordStore};
use serde::Serialize;

/// Default database filename inside the data directory.
const DATABASE_FILE: &str = "mnemos.db";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Database path given on the command line.
    pub db_path: Option<PathBuf>,
    /// User config directory (`--config-dir`, `MNEMOS_CONFIG_DIR` or XDG).
    pub config_dir: Option<PathBuf>,
    /// Merged configuration and where it came from.
    pub config: LoadedConfig,
}

impl Context {
    /// Database path: command line, then `[storage] database`, then the
    /// platform data directory.
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .or_else(|| {
                self.config
                    .config
                    .storage
                    .as_ref()
                    .and_then(|s| s.database.clone())
            })
            .or_else(|| dirs::data_dir().map(|d| d.join("mnemos").join(DATABASE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    /// Open the engine over the configured database and embedding provider.
    pub fn open_engine(&self) -> Result<MemoryEngine> {
        let config = &self.config.config;
        let embedder = build_embedder(&config.embedding())?;
        let path = self.database_path();
        let store = SqliteRecordStore::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let engine = MemoryEngine::open(EngineSettings::from(config), embedder, Arc::new(store))?;
        Ok(engine)
    }

    /// Print a value as pretty JSON.
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Show recovered failures on stderr when verbose.
    pub fn report_soft_failures(&self, failures: &[SoftFailure]) {
        if !self.verbose || failures.is_empty() {
            return;
        }
        let yellow = Style::new().yellow();
        for failure in failures {
            eprintln!(
                "{} {:?}: {}",
                yellow.apply_to("warning:"),
                failure.kind,
                failure.message
            );
        }
    }
}

/// Build an EmbedderSpec from EmbeddingConfig and construct the provider.
fn build_embedder(config: &EmbeddingConfig) -> Result<SharedEmbedder> {
    let provider = match config.provider {
        EmbeddingProvider::None => "none",
        EmbeddingProvider::Mock => "mock",
        EmbeddingProvider::OpenAi => "openai",
    };
    let openai = config.openai.as_ref();

    // Resolve OpenAI API key: config → env var
    let openai_api_key = openai
        .and_then(|c| c.api_key.clone())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    let spec = EmbedderSpec {
        provider: provider.to_string(),
        openai_api_key,
        openai_model: openai.map(|c| c.model.clone()),
        openai_base_url: openai.and_then(|c| c.base_url.clone()),
        dimensions: config
            .dimensions
            .or_else(|| openai.and_then(|c| c.dimensions)),
    };
    mnemos_embed::build_embedder(&spec).map_err(|e| anyhow::anyhow!("Failed to build embedder: {e}"))
}

/// Parse a memory ID argument.
pub fn parse_id(s: &str) -> Result<MemoryId> {
    MemoryId::parse(s).map_err(|_| anyhow::anyhow!("'{s}' is not a valid memory ID"))
}

/// Single-line preview, cut on a character boundary.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Section header in human output.
pub fn heading(title: &str) {
    println!("{}", console::style(title).bold());
    println!("{}", Style::new().dim().apply_to("─".repeat(50)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemos_embed::Embedder;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 40), "line one line two");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_parse_id() {
        let id = MemoryId::new();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(parse_id("nope").is_err());
    }

    #[test]
    fn test_mock_embedder_from_config() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Mock,
            dimensions: Some(32),
            openai: None,
        };
        let embedder = build_embedder(&config).unwrap();
        assert!(embedder.is_available());
    }
}
