//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [storage]                # record store location
//! [embedding]              # embedding provider
//! [engine]                 # classification, linking and decay thresholds
//! [query]                  # strategy thresholds and result cache
//! [query.ranking]          # ranking boosts
//! [logging]                # log file settings
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MnemosConfig {
    /// Record store configuration.
    pub storage: Option<StorageConfig>,

    /// Embedding provider configuration.
    pub embedding: Option<EmbeddingConfig>,

    /// Engine thresholds.
    pub engine: Option<EngineConfig>,

    /// Query engine configuration.
    pub query: Option<QueryConfig>,

    /// Log output configuration.
    pub logging: Option<LoggingConfig>,
}

impl MnemosConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is section-wise: a section present in `other` replaces the
    /// whole section in `self`.
    pub fn merge(&mut self, other: MnemosConfig) {
        if other.storage.is_some() {
            self.storage = other.storage;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.engine.is_some() {
            self.engine = other.engine;
        }
        if other.query.is_some() {
            self.query = other.query;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective engine settings (defaults when the section is absent).
    pub fn engine(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }

    /// Effective query settings (defaults when the section is absent).
    pub fn query(&self) -> QueryConfig {
        self.query.clone().unwrap_or_default()
    }

    /// Effective embedding settings (defaults when the section is absent).
    pub fn embedding(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    /// Effective logging settings (defaults when the section is absent).
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check that every fractional setting lies in `[0, 1]` and every
    /// window fits in [`MAX_WINDOW_HOURS`].
    pub fn validate(&self) -> Result<()> {
        let engine = self.engine();
        unit_interval("engine.connection_strength_threshold", engine.connection_strength_threshold)?;
        unit_interval("engine.decay_threshold", engine.decay_threshold)?;
        unit_interval("engine.dormant_fraction", engine.dormant_fraction)?;
        unit_interval("engine.contextual_strength", engine.contextual_strength)?;
        unit_interval("engine.temporal_strength", engine.temporal_strength)?;
        unit_interval("engine.consolidation_depth_step", engine.consolidation_depth_step)?;
        if engine.default_decay_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.default_decay_rate".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        window_hours("engine.temporal_window_hours", engine.temporal_window_hours)?;

        let query = self.query();
        unit_interval("query.substring_score", query.substring_score)?;
        unit_interval("query.tag_match_score", query.tag_match_score)?;
        unit_interval("query.category_match_score", query.category_match_score)?;
        unit_interval("query.emotional_significance", query.emotional_significance)?;
        unit_interval("query.semantic_similarity", query.semantic_similarity)?;
        if query.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query.cache_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        window_hours(
            "query.ranking.recency_window_hours",
            query.ranking.recency_window_hours,
        )?;
        Ok(())
    }
}

/// Upper bound for any window expressed in hours (a century).
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 100;

fn window_hours(field: &str, value: i64) -> Result<()> {
    if (0..=MAX_WINDOW_HOURS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be between 0 and {MAX_WINDOW_HOURS} hours, got {value}"),
        })
    }
}

fn unit_interval(field: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Record store configuration.
///
/// ```toml
/// [storage]
/// database = "~/.local/share/mnemos/memory.db"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database. Defaults to the platform data directory.
    pub database: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding provider configuration.
///
/// With no provider configured the engine skips semantic linking and
/// semantic search rather than failing.
///
/// ```toml
/// [embedding]
/// provider = "openai"       # "none", "mock", or "openai"
/// dimensions = 1536
///
/// [embedding.openai]
/// model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProvider,
    /// Output embedding dimensions. Default depends on provider.
    pub dimensions: Option<usize>,
    /// OpenAI-specific embedding settings.
    pub openai: Option<EmbeddingOpenAiConfig>,
}

impl EmbeddingConfig {
    /// Effective dimensions for the configured provider.
    pub fn effective_dimensions(&self) -> usize {
        if let Some(d) = self.dimensions {
            return d;
        }
        match self.provider {
            EmbeddingProvider::None => 0,
            EmbeddingProvider::Mock => 256,
            EmbeddingProvider::OpenAi => self
                .openai
                .as_ref()
                .and_then(|c| c.dimensions)
                .unwrap_or(1536),
        }
    }
}

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// No provider; semantic features are skipped.
    #[default]
    None,
    /// Deterministic local embedder (testing and offline use).
    Mock,
    /// OpenAI-compatible embeddings API.
    OpenAi,
}

/// OpenAI embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOpenAiConfig {
    /// Model name. Default: "text-embedding-3-small".
    pub model: String,
    /// Override dimensions (OpenAI supports reduced output).
    pub dimensions: Option<usize>,
    /// Custom API base URL (for Azure or proxies).
    pub base_url: Option<String>,
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
}

impl Default for EmbeddingOpenAiConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
            base_url: None,
            api_key: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Thresholds for classification, connection building and the decay manager.
///
/// ```toml
/// [engine]
/// connection_strength_threshold = 0.3
/// decay_threshold = 0.1
/// consolidation_threshold = 10
/// short_term_limit = 50
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Edges weaker than this are never kept.
    pub connection_strength_threshold: f32,
    /// Decay factor below which a node becomes dormant.
    pub decay_threshold: f32,
    /// Access count at which a node is consolidated.
    pub consolidation_threshold: u32,
    /// Access count at which a node becomes active.
    pub active_threshold: u32,
    /// Access count at which a short-term node is re-evaluated for promotion.
    pub promotion_threshold: u32,
    /// Integration depth gained on consolidation.
    pub consolidation_depth_step: f32,
    /// Short-term item count above which insights recommend consolidation.
    pub short_term_limit: usize,
    /// Dormant fraction above which insights recommend review.
    pub dormant_fraction: f32,
    /// Decay rate assigned to new nodes (per hour).
    pub default_decay_rate: f32,
    /// Strength of contextual (same project / shared tag) edges.
    pub contextual_strength: f32,
    /// Strength of temporal (created close together) edges.
    pub temporal_strength: f32,
    /// Trailing window for temporal edges, in hours.
    pub temporal_window_hours: i64,
    /// Maximum number of temporal edges created per new node.
    pub temporal_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_strength_threshold: 0.3,
            decay_threshold: 0.1,
            consolidation_threshold: 10,
            active_threshold: 5,
            promotion_threshold: 5,
            consolidation_depth_step: 0.2,
            short_term_limit: 50,
            dormant_fraction: 0.3,
            default_decay_rate: 0.1,
            contextual_strength: 0.6,
            temporal_strength: 0.4,
            temporal_window_hours: 24,
            temporal_limit: 5,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Query engine configuration.
///
/// ```toml
/// [query]
/// cache_ttl_secs = 3600
/// cache_capacity = 1024
/// emotional_significance = 0.7
///
/// [query.ranking]
/// agreement_bonus = 0.2
/// recency_boost = 1.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// How long a cached result list stays valid, in seconds.
    pub cache_ttl_secs: u64,
    /// Maximum number of cached result lists.
    pub cache_capacity: usize,
    /// Result count used when the caller does not pass one.
    pub default_max_results: usize,
    /// Score for an exact substring match of the query in the content.
    pub substring_score: f32,
    /// Score for a query that mentions one of the node's tags.
    pub tag_match_score: f32,
    /// Score for a query that mentions one of the node's categories.
    pub category_match_score: f32,
    /// Content matches at or below this score are dropped.
    pub min_content_score: f32,
    /// Goal matches at or below this keyword fraction are dropped.
    pub min_goal_fraction: f32,
    /// Structural matches at or below this similarity are dropped.
    pub min_structural_score: f32,
    /// Emotional weight above which a node is always surfaced.
    pub emotional_significance: f32,
    /// Embedding similarity above which a node counts as a semantic match.
    pub semantic_similarity: f32,
    /// Multiplier for semantic matches on episodic nodes.
    pub episodic_boost: f32,
    /// Queries run by the cache warm-up call.
    pub preload_queries: Vec<String>,
    /// Ranking boosts.
    pub ranking: RankingConfig,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_capacity: 1024,
            default_max_results: 10,
            substring_score: 0.8,
            tag_match_score: 0.6,
            category_match_score: 0.4,
            min_content_score: 0.1,
            min_goal_fraction: 0.2,
            min_structural_score: 0.3,
            emotional_significance: 0.7,
            semantic_similarity: 0.5,
            episodic_boost: 1.2,
            preload_queries: [
                "error", "bug", "fix", "problem", "how to", "what is", "why", "optimize",
                "improve", "performance", "test", "verify", "check",
            ]
            .iter()
            .map(|q| q.to_string())
            .collect(),
            ranking: RankingConfig::default(),
        }
    }
}

/// Ranking multipliers applied after strategy results are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Fraction of the best score added when several strategies agree.
    pub agreement_bonus: f32,
    /// Multiplier for nodes in the active state.
    pub active_boost: f32,
    /// Emotional weight contribution: `× (1 + factor · weight)`.
    pub emotional_factor: f32,
    /// Integration depth contribution: `× (1 + factor · depth)`.
    pub integration_factor: f32,
    /// Multiplier for nodes accessed within the recency window.
    pub recency_boost: f32,
    /// Recency window, in hours.
    pub recency_window_hours: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            agreement_bonus: 0.2,
            active_boost: 1.1,
            emotional_factor: 0.3,
            integration_factor: 0.2,
            recency_boost: 1.2,
            recency_window_hours: 24,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Log output configuration.
///
/// ```toml
/// [logging]
/// file = true
/// directory = "~/.config/mnemos/logs"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether to write JSON logs to a daily rolling file.
    pub file: bool,
    /// Log directory. Defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = MnemosConfig::from_toml("").unwrap();
        assert!(config.engine.is_none());
        assert_eq!(config.engine(), EngineConfig::default());
        assert_eq!(config.query().cache_ttl_secs, 3600);
    }

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.connection_strength_threshold, 0.3);
        assert_eq!(engine.decay_threshold, 0.1);
        assert_eq!(engine.consolidation_threshold, 10);
        assert_eq!(engine.promotion_threshold, 5);
        assert_eq!(engine.short_term_limit, 50);
        assert_eq!(engine.temporal_limit, 5);
    }

    #[test]
    fn test_partial_engine_section() {
        let config = MnemosConfig::from_toml(
            r#"
[engine]
short_term_limit = 10
decay_threshold = 0.2
"#,
        )
        .unwrap();
        let engine = config.engine();
        assert_eq!(engine.short_term_limit, 10);
        assert_eq!(engine.decay_threshold, 0.2);
        // untouched fields keep their defaults
        assert_eq!(engine.contextual_strength, 0.6);
    }

    #[test]
    fn test_query_ranking_section() {
        let config = MnemosConfig::from_toml(
            r#"
[query]
cache_ttl_secs = 60

[query.ranking]
agreement_bonus = 0.5
"#,
        )
        .unwrap();
        let query = config.query();
        assert_eq!(query.cache_ttl_secs, 60);
        assert_eq!(query.ranking.agreement_bonus, 0.5);
        assert_eq!(query.ranking.active_boost, 1.1);
        assert_eq!(query.preload_queries.len(), 13);
    }

    #[test]
    fn test_embedding_provider() {
        let config = MnemosConfig::from_toml(
            r#"
[embedding]
provider = "openai"

[embedding.openai]
dimensions = 512
"#,
        )
        .unwrap();
        let embedding = config.embedding();
        assert_eq!(embedding.provider, EmbeddingProvider::OpenAi);
        assert_eq!(embedding.effective_dimensions(), 512);
        assert_eq!(
            embedding.openai.unwrap().model,
            "text-embedding-3-small"
        );
    }

    #[test]
    fn test_embedding_default_is_none() {
        let embedding = EmbeddingConfig::default();
        assert_eq!(embedding.provider, EmbeddingProvider::None);
        assert_eq!(embedding.effective_dimensions(), 0);
    }

    #[test]
    fn test_merge_overrides_sections() {
        let mut base = MnemosConfig::from_toml(
            r#"
[engine]
short_term_limit = 20

[storage]
database = "/tmp/base.db"
"#,
        )
        .unwrap();
        let overlay = MnemosConfig::from_toml(
            r#"
[engine]
short_term_limit = 5
"#,
        )
        .unwrap();
        base.merge(overlay);
        assert_eq!(base.engine().short_term_limit, 5);
        assert_eq!(
            base.storage.unwrap().database,
            Some(PathBuf::from("/tmp/base.db"))
        );
    }

    #[test]
    fn test_roundtrip_toml() {
        let mut config = MnemosConfig::new();
        config.engine = Some(EngineConfig {
            short_term_limit: 7,
            ..Default::default()
        });
        let text = config.to_toml().unwrap();
        let parsed = MnemosConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = MnemosConfig::from_toml(
            r#"
[engine]
connection_strength_threshold = 1.5
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("connection_strength_threshold"));
        assert!(MnemosConfig::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        let config = MnemosConfig::from_toml(
            r#"
[query.ranking]
recency_window_hours = 9000000000000000
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recency_window_hours"));

        let config = MnemosConfig::from_toml(
            r#"
[engine]
temporal_window_hours = -1
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temporal_window_hours"));
    }
}
