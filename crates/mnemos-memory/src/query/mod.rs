//! Multi-strategy relevance search.
//!
//! A search runs up to five strategies against every candidate node:
//!
//! | strategy    | runs when                 | score                              |
//! |-------------|---------------------------|------------------------------------|
//! | content     | always                    | substring / tag / category / overlap, or embedding similarity |
//! | tag         | the context names tags    | fraction of requested tags present |
//! | goal        | the context names a goal  | fraction of goal keywords present  |
//! | structural  | the query has a shape     | Jaccard of structural patterns     |
//! | emotional   | emotional ranking enabled | emotional weight, if significant   |
//!
//! Scores of one node are combined (best score plus an agreement bonus when
//! several strategies matched), boosted by node state, weight, depth and
//! recency, then sorted. Result lists are cached per context.

pub mod cache;
pub mod ranking;
pub mod strategies;

use std::time::Duration;

use chrono::{DateTime, Utc};
use mnemos_config::QueryConfig;
use mnemos_embed::Embedder;
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{MemoryId, MemoryLayer, MemoryNode, MemoryState};

pub use cache::QueryCache;
pub use strategies::{PreparedQuery, StructuralPattern};

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters of one search. Also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryContext {
    pub query: String,
    /// Only nodes of this project are considered.
    pub project: Option<String>,
    /// Tags for the tag strategy.
    pub tags: Vec<String>,
    /// Goal type for the goal strategy (e.g. "debugging").
    pub goal: Option<String>,
    /// Result limit; zero means the configured default.
    pub max_results: usize,
    /// Run the emotional strategy and apply the emotional boost.
    pub include_emotional: bool,
    /// Boost nodes accessed recently.
    pub boost_recent: bool,
}

impl QueryContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project: None,
            tags: Vec::new(),
            goal: None,
            max_results: 0,
            include_emotional: true,
            boost_recent: true,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_emotional(mut self, include: bool) -> Self {
        self.include_emotional = include;
        self
    }

    pub fn with_recency_boost(mut self, boost: bool) -> Self {
        self.boost_recent = boost;
        self
    }

    /// Copy with the limit resolved and blank filters removed, so that
    /// equivalent contexts share a cache entry.
    pub(crate) fn normalized(&self, default_max_results: usize) -> Self {
        let mut ctx = self.clone();
        ctx.query = ctx.query.trim().to_string();
        ctx.project = ctx
            .project
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        ctx.tags.retain(|t| !t.trim().is_empty());
        ctx.goal = ctx
            .goal
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty());
        if ctx.max_results == 0 {
            ctx.max_results = default_max_results.max(1);
        }
        ctx
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Content,
    /// Content strategy, won by embedding similarity.
    Semantic,
    Tag,
    Goal,
    Structural,
    Emotional,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Content => "content",
            MatchType::Semantic => "semantic",
            MatchType::Tag => "tag",
            MatchType::Goal => "goal",
            MatchType::Structural => "structural",
            MatchType::Emotional => "emotional",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked hit, with a snapshot of the node taken at query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub memory_id: MemoryId,
    pub score: f32,
    /// Strategy with the best individual score.
    pub match_type: MatchType,
    pub matched_by: Vec<MatchType>,
    pub content: String,
    pub project: String,
    pub layer: MemoryLayer,
    pub state: MemoryState,
    pub emotional_weight: f32,
    pub last_accessed: DateTime<Utc>,
    pub topic_categories: Vec<String>,
}

/// Ranked results of a search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub results: Vec<QueryResult>,
    pub from_cache: bool,
}

/// Counters over every search since the engine started.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub hit_rate: f64,
    pub average_response_ms: f64,
    pub cache_size: usize,
}

#[derive(Debug, Default)]
struct StatsInner {
    total_queries: u64,
    cache_hits: u64,
    total_time: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Scores nodes, owns the result cache and the query counters.
#[derive(Debug)]
pub struct QueryEngine {
    config: QueryConfig,
    cache: QueryCache,
    stats: Mutex<StatsInner>,
}

impl QueryEngine {
    pub fn new(config: QueryConfig) -> Self {
        let cache = QueryCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            config,
            cache,
            stats: Mutex::new(StatsInner::default()),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Run every applicable strategy against one node and return its ranked
    /// result, or `None` if no strategy matched.
    pub fn score_node(
        &self,
        ctx: &QueryContext,
        prepared: &PreparedQuery,
        node: &MemoryNode,
        embedder: Option<&dyn Embedder>,
        now: DateTime<Utc>,
    ) -> Option<QueryResult> {
        if let Some(project) = &ctx.project
            && node.project != *project
        {
            return None;
        }

        let config = &self.config;
        let mut matches: Vec<(MatchType, f32)> = Vec::with_capacity(5);

        let textual = strategies::content_score(prepared, node, config);
        let semantic =
            embedder.and_then(|e| strategies::semantic_score(prepared, node, e, config));
        match (textual, semantic) {
            (Some(t), Some(s)) if s > t => matches.push((MatchType::Semantic, s)),
            (Some(t), _) => matches.push((MatchType::Content, t)),
            (None, Some(s)) => matches.push((MatchType::Semantic, s)),
            (None, None) => {}
        }
        if let Some(s) = strategies::tag_score(prepared, node) {
            matches.push((MatchType::Tag, s));
        }
        if let Some(s) = strategies::goal_score(prepared, node, config) {
            matches.push((MatchType::Goal, s));
        }
        if let Some(s) = strategies::structural_score(prepared, node, config) {
            matches.push((MatchType::Structural, s));
        }
        if let Some(s) = strategies::emotional_score(prepared, node, config) {
            matches.push((MatchType::Emotional, s));
        }

        let (match_type, score, matched_by) =
            ranking::combine(&matches, config.ranking.agreement_bonus)?;
        let score = ranking::boost(
            score,
            node,
            &config.ranking,
            ctx.include_emotional,
            ctx.boost_recent,
            now,
        );

        Some(QueryResult {
            memory_id: node.id,
            score,
            match_type,
            matched_by,
            content: node.content.clone(),
            project: node.project.clone(),
            layer: node.metadata.layer,
            state: node.metadata.state,
            emotional_weight: node.metadata.emotional_weight,
            last_accessed: node.metadata.last_accessed,
            topic_categories: node.metadata.topic_categories.clone(),
        })
    }

    /// Sort and truncate scored results.
    pub fn finish(&self, mut results: Vec<QueryResult>, max_results: usize) -> Vec<QueryResult> {
        ranking::sort_results(&mut results);
        results.truncate(max_results);
        results
    }

    pub(crate) fn record(&self, elapsed: Duration, cache_hit: bool) {
        let mut stats = self.stats.lock();
        stats.total_queries += 1;
        stats.total_time += elapsed;
        if cache_hit {
            stats.cache_hits += 1;
        }
    }

    pub fn stats(&self) -> QueryStats {
        let stats = self.stats.lock();
        let (hit_rate, average_response_ms) = if stats.total_queries == 0 {
            (0.0, 0.0)
        } else {
            let n = stats.total_queries as f64;
            (
                stats.cache_hits as f64 / n,
                stats.total_time.as_secs_f64() * 1000.0 / n,
            )
        };
        QueryStats {
            total_queries: stats.total_queries,
            cache_hits: stats.cache_hits,
            hit_rate,
            average_response_ms,
            cache_size: self.cache.len(),
        }
    }
}
