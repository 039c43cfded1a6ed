//! Search, the result cache and query statistics.

use std::time::Instant;

use chrono::Utc;
use mnemos_embed::Embedder;
use tracing::{debug, info};

use super::{MemoryEngine, Outcome};
use crate::error::SoftFailure;
use crate::query::{PreparedQuery, QueryContext, QueryStats, SearchResponse};

impl MemoryEngine {
    /// Ranked search. Never fails: an unusable embedding provider only
    /// drops semantic scoring and is reported as a soft failure.
    ///
    /// Searching does not count as reading the returned nodes.
    pub async fn search(&self, ctx: &QueryContext) -> Outcome<SearchResponse> {
        let started = Instant::now();
        let query = &self.inner.query;
        let key = ctx.normalized(query.config().default_max_results);

        if let Some(results) = query.cache().get(&key) {
            query.record(started.elapsed(), true);
            return Outcome::new(SearchResponse {
                results,
                from_cache: true,
            });
        }

        let mut failures = Vec::new();
        let mut prepared = PreparedQuery::new(&key);
        let embedder = &self.inner.embedder;
        let mut semantic: Option<&dyn Embedder> = None;
        let mut transient_failure = false;
        if !key.query.is_empty() {
            match embedder.embed(&key.query).await {
                Ok(vector) => {
                    prepared = prepared.with_embedding(vector);
                    semantic = Some(&**embedder);
                }
                Err(e) => {
                    debug!(error = %e, "Semantic scoring skipped");
                    transient_failure = embedder.is_available();
                    failures.push(SoftFailure::provider_unavailable(None, e.to_string()));
                }
            }
        }

        let now = Utc::now();
        let scored: Vec<_> = self
            .inner
            .arena
            .handles()
            .into_iter()
            .filter_map(|(_, handle)| {
                let node = handle.read();
                query.score_node(&key, &prepared, &node, semantic, now)
            })
            .collect();
        let results = query.finish(scored, key.max_results);

        // a provider that is configured but failed may recover; do not pin
        // degraded results for a whole TTL
        if !transient_failure {
            query.cache().insert(key.clone(), results.clone());
        }
        query.record(started.elapsed(), false);
        debug!(query = %key.query, results = results.len(), "Search finished");

        Outcome::with_failures(
            SearchResponse {
                results,
                from_cache: false,
            },
            failures,
        )
    }

    /// Run the configured common queries to fill the cache. Returns how many
    /// queries were run.
    pub async fn preload_common_queries(&self, project: Option<&str>) -> Outcome<usize> {
        let queries = self.inner.query.config().preload_queries.clone();
        let mut failures = Vec::new();
        for q in &queries {
            let mut ctx = QueryContext::new(q.as_str()).with_max_results(5);
            if let Some(project) = project {
                ctx = ctx.with_project(project);
            }
            let outcome = self.search(&ctx).await;
            failures.extend(outcome.soft_failures);
        }
        // one provider failure per query says nothing new
        failures.dedup_by(|a, b| a.kind == b.kind && a.message == b.message);
        info!(count = queries.len(), "Preloaded common queries");
        Outcome::with_failures(queries.len(), failures)
    }

    /// Drop every cached result list.
    pub fn clear_cache(&self) {
        self.inner.query.cache().clear();
        debug!("Query cache cleared");
    }

    pub fn query_stats(&self) -> QueryStats {
        self.inner.query.stats()
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::MemoryEngine;
    use crate::query::{MatchType, QueryContext};
    use crate::types::RawMemory;

    async fn seeded() -> MemoryEngine {
        let engine = MemoryEngine::in_memory();
        for (content, project) in [
            ("Fix the parser error on empty input", "alpha"),
            ("Parser benchmarks for large files", "alpha"),
            ("Parser notes from the beta project", "beta"),
        ] {
            engine
                .classify_and_store(RawMemory::new(content).with_project(project))
                .await
                .unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_search_served_from_cache() {
        let engine = seeded().await;
        let ctx = QueryContext::new("parser").with_project("alpha");

        let first = engine.search(&ctx).await;
        assert!(!first.value.from_cache);
        assert_eq!(first.value.results.len(), 2);
        assert!(first.value.results.iter().all(|r| r.project == "alpha"));

        let second = engine.search(&ctx).await;
        assert!(second.value.from_cache);
        assert_eq!(second.value.results, first.value.results);

        let stats = engine.query_stats();
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_size, 1);

        engine.clear_cache();
        assert!(!engine.search(&ctx).await.value.from_cache);
    }

    #[tokio::test]
    async fn test_search_does_not_count_reads() {
        let engine = seeded().await;
        let results = engine.search(&QueryContext::new("parser")).await.value.results;
        for r in results {
            assert_eq!(engine.inspect(r.memory_id).unwrap().metadata.access_count, 0);
        }
    }

    #[tokio::test]
    async fn test_goal_search() {
        let engine = seeded().await;
        let ctx = QueryContext::new("zzz")
            .with_goal("debugging")
            .with_emotional(false);
        let results = engine.search(&ctx).await.value.results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Goal);
    }

    #[tokio::test]
    async fn test_empty_engine_returns_empty_list() {
        let engine = MemoryEngine::in_memory();
        assert!(engine.search(&QueryContext::new("anything")).await.value.results.is_empty());
    }

    #[tokio::test]
    async fn test_preload_fills_cache() {
        let engine = seeded().await;
        let outcome = engine.preload_common_queries(Some("alpha")).await;
        assert_eq!(outcome.value, 13);
        assert_eq!(engine.query_stats().cache_size, 13);
    }
}
