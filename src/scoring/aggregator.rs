//! Running-score aggregation.
//!
//! Merges freshly extracted sub-scores into a session's running
//! [`DimensionScores`] and derives the composite index and tier. The merge
//! policy is replace-with-latest: sub-scores describe the current emotional
//! state, so summing them would turn the index into a counter.

use super::{Dimension, DimensionScores, Tier};

/// Deterministic, stateless aggregation over session scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Replace each dimension with its latest computed value, then return
    /// the recomputed composite index and its tier.
    pub fn apply(&self, scores: &mut DimensionScores, delta: &DimensionScores) -> (f64, Tier) {
        for dim in Dimension::ALL {
            scores.set(dim, delta.get(dim));
        }
        self.current(scores)
    }

    /// Recompute composite and tier from the running scores without merging
    /// anything — the forced aggregation pass used when a report is
    /// triggered by a turn that carried no new textual signal.
    pub fn current(&self, scores: &DimensionScores) -> (f64, Tier) {
        let composite = scores.composite();
        (composite, Tier::for_composite(composite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_not_sums() {
        let aggregator = ScoreAggregator;
        let mut scores = DimensionScores {
            regret: 85.0,
            ..Default::default()
        };

        let delta = DimensionScores {
            regret: 40.0,
            attachment: 60.0,
            ..Default::default()
        };
        aggregator.apply(&mut scores, &delta);

        assert_eq!(scores.regret, 40.0);
        assert_eq!(scores.attachment, 60.0);
    }

    #[test]
    fn test_apply_returns_composite_and_tier() {
        let aggregator = ScoreAggregator;
        let mut scores = DimensionScores::default();
        let delta = DimensionScores {
            attachment: 50.0,
            regret: 85.0,
            unresolved: 50.0,
            comparison: 50.0,
            avoidance: 50.0,
        };

        let (composite, tier) = aggregator.apply(&mut scores, &delta);
        assert!((composite - 58.75).abs() < 1e-9);
        assert_eq!(tier, Tier::Lingering);
    }

    #[test]
    fn test_current_does_not_mutate() {
        let aggregator = ScoreAggregator;
        let scores = DimensionScores {
            attachment: 90.0,
            regret: 90.0,
            unresolved: 90.0,
            comparison: 90.0,
            avoidance: 90.0,
        };
        let before = scores;
        let (composite, tier) = aggregator.current(&scores);
        assert_eq!(scores, before);
        assert!((composite - 90.0).abs() < 1e-9);
        assert_eq!(tier, Tier::Consuming);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let aggregator = ScoreAggregator;
        let delta = DimensionScores {
            attachment: 33.0,
            regret: 44.0,
            unresolved: 55.0,
            comparison: 66.0,
            avoidance: 77.0,
        };
        let mut a = DimensionScores::default();
        let mut b = DimensionScores::default();
        assert_eq!(
            aggregator.apply(&mut a, &delta),
            aggregator.apply(&mut b, &delta)
        );
        assert_eq!(a, b);
    }
}
