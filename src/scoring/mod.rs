//! Dimension scores, composite index, and interpretive tiers.
//!
//! The composite "miryeon" (lingering-attachment) index is a fixed weighted
//! sum over five emotional dimensions, each scored 0–100 per session. The
//! weights and tier band boundaries are the contract of the whole engine, so
//! they live here as named constants rather than in configuration.

pub mod aggregator;
pub mod extractor;
pub mod report;

use serde::{Deserialize, Serialize};

pub use aggregator::ScoreAggregator;
pub use extractor::SignalExtractor;
pub use report::ReportGenerator;

// ---------------------------------------------------------------------------
// Dimensions and weights
// ---------------------------------------------------------------------------

/// Weight of the attachment dimension in the composite index.
pub const WEIGHT_ATTACHMENT: f64 = 0.30;
/// Weight of the regret dimension.
pub const WEIGHT_REGRET: f64 = 0.25;
/// Weight of the unresolved-feelings dimension.
pub const WEIGHT_UNRESOLVED: f64 = 0.20;
/// Weight of the comparison-standard dimension.
pub const WEIGHT_COMPARISON: f64 = 0.15;
/// Weight of the avoidance/approach dimension.
pub const WEIGHT_AVOIDANCE: f64 = 0.10;

/// The five emotional dimensions tracked per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Lingering attachment to the ex-partner.
    Attachment,
    /// Regret about how the relationship ended.
    Regret,
    /// Unresolved feelings and unanswered questions.
    Unresolved,
    /// Using the ex as the standard of comparison for new people.
    Comparison,
    /// Avoidance of (vs. openness to) contact and reminders.
    Avoidance,
}

impl Dimension {
    /// All dimensions, in composite-weight order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Attachment,
        Dimension::Regret,
        Dimension::Unresolved,
        Dimension::Comparison,
        Dimension::Avoidance,
    ];

    /// The dimension's weight in the composite index.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Attachment => WEIGHT_ATTACHMENT,
            Dimension::Regret => WEIGHT_REGRET,
            Dimension::Unresolved => WEIGHT_UNRESOLVED,
            Dimension::Comparison => WEIGHT_COMPARISON,
            Dimension::Avoidance => WEIGHT_AVOIDANCE,
        }
    }

    /// Wire/report key for the dimension.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Attachment => "attachment",
            Dimension::Regret => "regret",
            Dimension::Unresolved => "unresolved",
            Dimension::Comparison => "comparison",
            Dimension::Avoidance => "avoidance",
        }
    }
}

// ---------------------------------------------------------------------------
// DimensionScores
// ---------------------------------------------------------------------------

/// Per-session sub-scores, one per dimension, each in [0, 100].
///
/// Every key is always present; a fresh session starts at all zeros. Values
/// are *replaced* (not accumulated) on each scored turn — they represent the
/// current emotional state, not a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub attachment: f64,
    pub regret: f64,
    pub unresolved: f64,
    pub comparison: f64,
    pub avoidance: f64,
}

impl DimensionScores {
    /// Read one dimension's value.
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Attachment => self.attachment,
            Dimension::Regret => self.regret,
            Dimension::Unresolved => self.unresolved,
            Dimension::Comparison => self.comparison,
            Dimension::Avoidance => self.avoidance,
        }
    }

    /// Write one dimension's value.
    pub fn set(&mut self, dimension: Dimension, value: f64) {
        let slot = match dimension {
            Dimension::Attachment => &mut self.attachment,
            Dimension::Regret => &mut self.regret,
            Dimension::Unresolved => &mut self.unresolved,
            Dimension::Comparison => &mut self.comparison,
            Dimension::Avoidance => &mut self.avoidance,
        };
        *slot = value;
    }

    /// True when every dimension is exactly zero.
    pub fn is_zero(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d) == 0.0)
    }

    /// The composite index: fixed weighted sum, always in [0, 100] when each
    /// sub-score is in [0, 100] (the weights sum to 1.0).
    pub fn composite(&self) -> f64 {
        Dimension::ALL
            .iter()
            .map(|d| self.get(*d) * d.weight())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Interpretive band of the composite index.
///
/// The five bands partition [0, 100] with inclusive upper bounds evaluated
/// ascending, so a composite of exactly 20 lands in the lowest band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// 0–20: fully moved on.
    Settled,
    /// 21–40: quiet afterglow.
    Afterglow,
    /// 41–60: moderate lingering attachment.
    Lingering,
    /// 61–80: strong lingering attachment.
    Strong,
    /// 81–100: very strong lingering attachment.
    Consuming,
}

/// Inclusive upper bound of each band, ascending.
pub const TIER_UPPER_BOUNDS: [(Tier, f64); 5] = [
    (Tier::Settled, 20.0),
    (Tier::Afterglow, 40.0),
    (Tier::Lingering, 60.0),
    (Tier::Strong, 80.0),
    (Tier::Consuming, 100.0),
];

impl Tier {
    /// Band lookup for a composite index.
    pub fn for_composite(composite: f64) -> Tier {
        for (tier, upper) in TIER_UPPER_BOUNDS {
            if composite <= upper {
                return tier;
            }
        }
        Tier::Consuming
    }

    /// Human-readable band label.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Settled => "완전 정리 단계",
            Tier::Afterglow => "잔잔한 여운 단계",
            Tier::Lingering => "적당한 미련 단계",
            Tier::Strong => "강한 미련 단계",
            Tier::Consuming => "매우 강한 미련 단계",
        }
    }

    /// Emoji marker rendered next to the index in reports.
    pub fn emoji(self) -> &'static str {
        match self {
            Tier::Settled => "💚",
            Tier::Afterglow => "💛",
            Tier::Lingering => "🧡",
            Tier::Strong => "❤️",
            Tier::Consuming => "💔",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_composite_weighted_sum_exact() {
        let scores = DimensionScores {
            attachment: 80.0,
            regret: 60.0,
            unresolved: 40.0,
            comparison: 20.0,
            avoidance: 10.0,
        };
        let expected = 0.30 * 80.0 + 0.25 * 60.0 + 0.20 * 40.0 + 0.15 * 20.0 + 0.10 * 10.0;
        assert!((scores.composite() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_composite_bounds() {
        let zero = DimensionScores::default();
        assert_eq!(zero.composite(), 0.0);

        let full = DimensionScores {
            attachment: 100.0,
            regret: 100.0,
            unresolved: 100.0,
            comparison: 100.0,
            avoidance: 100.0,
        };
        assert!((full.composite() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_lookup_is_total() {
        // Every integer composite maps to exactly one band.
        for value in 0..=100 {
            let _ = Tier::for_composite(value as f64);
        }
    }

    #[test]
    fn test_tier_boundaries_resolve_to_lower_band() {
        assert_eq!(Tier::for_composite(20.0), Tier::Settled);
        assert_eq!(Tier::for_composite(40.0), Tier::Afterglow);
        assert_eq!(Tier::for_composite(60.0), Tier::Lingering);
        assert_eq!(Tier::for_composite(80.0), Tier::Strong);
        assert_eq!(Tier::for_composite(100.0), Tier::Consuming);
    }

    #[test]
    fn test_tier_interior_values() {
        assert_eq!(Tier::for_composite(0.0), Tier::Settled);
        assert_eq!(Tier::for_composite(20.5), Tier::Afterglow);
        assert_eq!(Tier::for_composite(58.75), Tier::Lingering);
        assert_eq!(Tier::for_composite(80.1), Tier::Consuming);
        assert_eq!(Tier::for_composite(99.9), Tier::Consuming);
    }

    #[test]
    fn test_dimension_set_get_roundtrip() {
        let mut scores = DimensionScores::default();
        for (i, dim) in Dimension::ALL.iter().enumerate() {
            scores.set(*dim, (i as f64 + 1.0) * 10.0);
        }
        for (i, dim) in Dimension::ALL.iter().enumerate() {
            assert_eq!(scores.get(*dim), (i as f64 + 1.0) * 10.0);
        }
        assert!(!scores.is_zero());
    }
}
