//! Usage and time driven state transitions and layer promotion.

use chrono::{DateTime, Utc};
use mnemos_config::EngineConfig;

use crate::classifier::Classifier;
use crate::types::{MemoryLayer, MemoryMetadata, MemoryState};

/// What one evaluation changed on a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub decay_factor: f32,
    /// `(from, to)` when the state changed.
    pub state: Option<(MemoryState, MemoryState)>,
    /// `(from, to)` when the node left the short-term layer.
    pub layer: Option<(MemoryLayer, MemoryLayer)>,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        self.state.is_some() || self.layer.is_some()
    }
}

/// Applies the layer/decay rules to one node at a time.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    decay_threshold: f32,
    consolidation_threshold: u32,
    active_threshold: u32,
    promotion_threshold: u32,
    consolidation_depth_step: f32,
    classifier: Classifier,
}

impl LifecycleManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            decay_threshold: config.decay_threshold,
            consolidation_threshold: config.consolidation_threshold,
            active_threshold: config.active_threshold,
            promotion_threshold: config.promotion_threshold,
            consolidation_depth_step: config.consolidation_depth_step,
            classifier: Classifier::new(),
        }
    }

    /// Evaluate and mutate `metadata` in place.
    ///
    /// State rules in priority order: consolidation by access count (which
    /// also deepens integration once, on entry), active by access count,
    /// dormant by decay. Short-term nodes with enough accesses are promoted
    /// using `content`; promotion never targets short-term.
    pub fn evaluate(
        &self,
        metadata: &mut MemoryMetadata,
        content: &str,
        now: DateTime<Utc>,
    ) -> Transition {
        let decay_factor = metadata.decay_factor(now);
        let before = metadata.state;
        let access = metadata.access_count;

        let next = if access >= self.consolidation_threshold {
            Some(MemoryState::Consolidated)
        } else if access >= self.active_threshold {
            Some(MemoryState::Active)
        } else if decay_factor < self.decay_threshold {
            Some(MemoryState::Dormant)
        } else {
            None
        };

        let mut state = None;
        if let Some(next) = next
            && next != before
        {
            if next == MemoryState::Consolidated {
                metadata.integration_depth =
                    (metadata.integration_depth + self.consolidation_depth_step).clamp(0.0, 1.0);
            }
            metadata.state = next;
            state = Some((before, next));
        }

        let mut layer = None;
        if metadata.layer == MemoryLayer::ShortTerm && access >= self.promotion_threshold {
            let target = self.classifier.promotion_layer(content);
            layer = Some((metadata.layer, target));
            metadata.layer = target;
        }

        Transition {
            decay_factor,
            state,
            layer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn manager() -> LifecycleManager {
        LifecycleManager::new(&EngineConfig::default())
    }

    #[test]
    fn test_untouched_recent_node_unchanged() {
        let now = Utc::now();
        let mut meta = MemoryMetadata::new(now, 0.1);
        let t = manager().evaluate(&mut meta, "x", now);
        assert!(!t.is_change());
        assert_eq!(meta.state, MemoryState::Fresh);
    }

    #[test]
    fn test_old_node_goes_dormant_and_stays_short_term() {
        let now = Utc::now();
        let mut meta = MemoryMetadata::new(now - Duration::days(30), 0.1);
        meta.layer = MemoryLayer::ShortTerm;
        let t = manager().evaluate(&mut meta, "TODO: how to deploy", now);
        assert!(t.decay_factor < 0.1);
        assert_eq!(t.state, Some((MemoryState::Fresh, MemoryState::Dormant)));
        assert_eq!(t.layer, None);
        assert_eq!(meta.layer, MemoryLayer::ShortTerm);
    }

    #[test]
    fn test_access_beats_decay() {
        let now = Utc::now();
        let mut meta = MemoryMetadata::new(now - Duration::days(30), 0.1);
        meta.access_count = 5;
        manager().evaluate(&mut meta, "x", now);
        assert_eq!(meta.state, MemoryState::Active);
    }

    #[test]
    fn test_consolidation_deepens_once() {
        let now = Utc::now();
        let mut meta = MemoryMetadata::new(now, 0.1);
        meta.access_count = 10;
        meta.integration_depth = 0.9;
        let m = manager();
        m.evaluate(&mut meta, "x", now);
        assert_eq!(meta.state, MemoryState::Consolidated);
        assert_eq!(meta.integration_depth, 1.0);

        meta.integration_depth = 0.5;
        let t = m.evaluate(&mut meta, "x", now);
        assert_eq!(t.state, None);
        assert_eq!(meta.integration_depth, 0.5);
    }

    #[test]
    fn test_short_term_promotion() {
        let now = Utc::now();
        let mut meta = MemoryMetadata::new(now, 0.1);
        meta.layer = MemoryLayer::ShortTerm;
        meta.access_count = 5;
        let t = manager().evaluate(&mut meta, "todo: step through the release", now);
        assert_eq!(t.layer, Some((MemoryLayer::ShortTerm, MemoryLayer::Procedural)));
        assert_eq!(meta.layer, MemoryLayer::Procedural);

        // other layers are never moved
        let mut meta = MemoryMetadata::new(now, 0.1);
        meta.layer = MemoryLayer::Semantic;
        meta.access_count = 50;
        assert_eq!(manager().evaluate(&mut meta, "how to", now).layer, None);
    }
}
