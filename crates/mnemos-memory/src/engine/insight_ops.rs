use tracing::debug;

use super::MemoryEngine;
use crate::insights::{self, InsightsReport};

impl MemoryEngine {
    /// Aggregate report over every node, or over one project's nodes.
    pub fn insights(&self, project: Option<&str>) -> InsightsReport {
        let nodes: Vec<_> = self
            .inner
            .arena
            .snapshot()
            .into_iter()
            .filter(|(_, node)| project.is_none_or(|p| node.project == p))
            .collect();
        let report = insights::build(project, &nodes, &self.inner.graph.read(), &self.inner.config);
        debug!(
            project = project.unwrap_or("*"),
            total = report.total_memories,
            "Built insights"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::MemoryEngine;
    use crate::types::RawMemory;

    #[tokio::test]
    async fn test_insights_scoped_to_project() {
        let engine = MemoryEngine::in_memory();
        for (content, project) in [
            ("React hooks notes", "web"),
            ("React component tests", "web"),
            ("Kernel scheduling", "os"),
        ] {
            engine
                .classify_and_store(RawMemory::new(content).with_project(project))
                .await
                .unwrap();
        }

        let web = engine.insights(Some("web"));
        assert_eq!(web.total_memories, 2);
        assert_eq!(web.layer_distribution.values().sum::<usize>(), 2);
        assert!(web.total_connections > 0);

        let all = engine.insights(None);
        assert_eq!(all.total_memories, 3);
        assert!(all.total_connections >= web.total_connections);
        assert!(engine.insights(Some("missing")).recommendations.is_empty());
    }
}
