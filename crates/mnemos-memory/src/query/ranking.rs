//! Combining strategy scores and applying ranking boosts.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use mnemos_config::RankingConfig;

use super::{MatchType, QueryResult};
use crate::types::{MemoryNode, MemoryState};

/// Fold the per-strategy scores of one node into a single score.
///
/// One match keeps its score; several matches take the best score plus
/// `agreement_bonus` times that score. Returns the best match type, the
/// combined score, and every strategy that matched. Ties go to the
/// strategy listed first.
pub fn combine(
    matches: &[(MatchType, f32)],
    agreement_bonus: f32,
) -> Option<(MatchType, f32, Vec<MatchType>)> {
    let (mut best_type, mut best) = *matches.first()?;
    for &(match_type, score) in &matches[1..] {
        if score > best {
            best_type = match_type;
            best = score;
        }
    }
    let score = if matches.len() > 1 {
        best + agreement_bonus * best
    } else {
        best
    };
    let matched_by = matches.iter().map(|(t, _)| *t).collect();
    Some((best_type, score, matched_by))
}

/// Apply state, emotional, integration and recency boosts.
pub fn boost(
    score: f32,
    node: &MemoryNode,
    ranking: &RankingConfig,
    include_emotional: bool,
    boost_recent: bool,
    now: DateTime<Utc>,
) -> f32 {
    let meta = &node.metadata;
    let mut score = score;
    if meta.state == MemoryState::Active {
        score *= ranking.active_boost;
    }
    if include_emotional {
        score *= 1.0 + ranking.emotional_factor * meta.emotional_weight;
    }
    score *= 1.0 + ranking.integration_factor * meta.integration_depth;
    if boost_recent && now - meta.last_accessed < hours(ranking.recency_window_hours) {
        score *= ranking.recency_boost;
    }
    score
}

/// `value` hours as a duration, saturating on overflow.
pub(crate) fn hours(value: i64) -> Duration {
    Duration::try_hours(value).unwrap_or(Duration::MAX)
}

/// Order by descending score, ties broken by ID so the order is stable.
pub fn sort_results(results: &mut [QueryResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.memory_id.cmp(&b.memory_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawMemory;

    #[test]
    fn test_combine_single_and_agreement() {
        let (t, s, by) = combine(&[(MatchType::Tag, 0.5)], 0.2).unwrap();
        assert_eq!(t, MatchType::Tag);
        assert_eq!(s, 0.5);
        assert_eq!(by, vec![MatchType::Tag]);

        let (t, s, by) = combine(
            &[(MatchType::Content, 0.4), (MatchType::Goal, 0.5), (MatchType::Tag, 0.3)],
            0.2,
        )
        .unwrap();
        assert_eq!(t, MatchType::Goal);
        // bonus applies once, not per extra strategy
        assert!((s - 0.6).abs() < 1e-6);
        assert_eq!(by.len(), 3);

        assert!(combine(&[], 0.2).is_none());
    }

    #[test]
    fn test_boosts() {
        let now = Utc::now();
        let ranking = RankingConfig::default();
        let mut node = MemoryNode::from_raw(RawMemory::new("x"), now - Duration::days(3), 0.1);
        node.metadata.emotional_weight = 0.5;

        let base = boost(1.0, &node, &ranking, true, true, now);
        assert!((base - 1.15).abs() < 1e-5);

        node.metadata.state = MemoryState::Active;
        node.metadata.integration_depth = 0.5;
        node.metadata.last_accessed = now;
        let boosted = boost(1.0, &node, &ranking, true, true, now);
        assert!((boosted - 1.1 * 1.15 * 1.1 * 1.2).abs() < 1e-5);

        let plain = boost(1.0, &node, &ranking, false, false, now);
        assert!((plain - 1.1 * 1.1).abs() < 1e-5);
    }

    #[test]
    fn test_oversized_recency_window_saturates() {
        let now = Utc::now();
        let ranking = RankingConfig {
            recency_window_hours: 9_000_000_000_000_000,
            ..RankingConfig::default()
        };
        let node = MemoryNode::from_raw(RawMemory::new("x"), now - Duration::days(3), 0.1);
        let score = boost(1.0, &node, &ranking, false, true, now);
        assert!((score - 1.2).abs() < 1e-5);
        assert_eq!(hours(i64::MAX), Duration::MAX);
    }
}
