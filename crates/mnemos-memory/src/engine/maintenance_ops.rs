//! The layer/decay maintenance pass.
//!
//! A pass walks the arena in index order, evaluating one node at a time
//! under that node's lock and persisting it independently. Cancellation is
//! checked between nodes; a cancelled pass reports the index to resume from.
//! Once every node has been visited the pass prunes weak edges, refreshes
//! the affected aggregates and drops expired cache entries.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::MemoryEngine;
use crate::error::SoftFailure;

/// What one maintenance pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    /// Nodes evaluated by this pass.
    pub processed: usize,
    pub state_changes: usize,
    /// Nodes moved out of the short-term layer.
    pub promotions: usize,
    pub pruned_connections: usize,
    pub expired_cache_entries: usize,
    pub soft_failures: Vec<SoftFailure>,
    pub cancelled: bool,
    /// Arena index to pass to [`MemoryEngine::run_maintenance_from`] when
    /// the pass was cancelled.
    pub checkpoint: Option<usize>,
}

impl MemoryEngine {
    /// Run a full pass from the first node.
    pub fn run_maintenance(&self, token: &CancellationToken) -> MaintenanceReport {
        self.run_maintenance_from(0, token)
    }

    /// Run a pass starting at arena index `start`.
    ///
    /// A node whose write fails is reported and skipped; the remaining nodes
    /// are still processed. Edge pruning only happens on a pass that reached
    /// the end.
    pub fn run_maintenance_from(&self, start: usize, token: &CancellationToken) -> MaintenanceReport {
        let now = Utc::now();
        let mut report = MaintenanceReport::default();

        for (index, handle) in self.inner.arena.handles().into_iter().skip(start) {
            if token.is_cancelled() {
                report.cancelled = true;
                report.checkpoint = Some(index.as_usize());
                info!(
                    processed = report.processed,
                    checkpoint = index.as_usize(),
                    "Maintenance cancelled"
                );
                return report;
            }

            let changed = {
                let mut guard = handle.write();
                let node = &mut *guard;
                let transition = self
                    .inner
                    .lifecycle
                    .evaluate(&mut node.metadata, &node.content, now);
                if let Some((from, to)) = transition.state {
                    report.state_changes += 1;
                    debug!(memory_id = %node.id, %from, %to, "State changed");
                }
                if let Some((from, to)) = transition.layer {
                    report.promotions += 1;
                    debug!(memory_id = %node.id, %from, %to, "Layer promoted");
                }
                transition.is_change().then(|| node.clone())
            };
            report.processed += 1;

            if let Some(node) = changed
                && let Some(failure) = self.persist_node(&node)
            {
                report.soft_failures.push(failure);
            }
        }

        let pruned = self
            .inner
            .graph
            .write()
            .prune_below(self.inner.config.connection_strength_threshold);
        report.pruned_connections = pruned.len();
        if !pruned.is_empty() {
            let touched: BTreeSet<_> = pruned.iter().flat_map(|&(s, t, _)| [s, t]).collect();
            let deletions = pruned.into_iter().map(|(s, t, ty)| (s, t, ty, None)).collect();
            report.soft_failures.extend(self.persist_edges(deletions));
            report
                .soft_failures
                .extend(self.refresh_aggregates(&touched, true));
        }

        report.expired_cache_entries = self.inner.query.cache().purge_expired();

        info!(
            processed = report.processed,
            state_changes = report.state_changes,
            promotions = report.promotions,
            pruned = report.pruned_connections,
            failures = report.soft_failures.len(),
            "Maintenance finished"
        );
        report
    }

    /// Run a pass from `start` on the blocking pool.
    pub fn spawn_maintenance(
        &self,
        start: usize,
        token: CancellationToken,
    ) -> JoinHandle<MaintenanceReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.run_maintenance_from(start, &token))
    }
}
