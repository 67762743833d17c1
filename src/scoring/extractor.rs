//! Lexical signal extraction from user turns.
//!
//! Each of the five dimensions is scored independently from keyword presence
//! in an analysis window (the current turn plus a bounded slice of recent
//! user turns). The scoring rule per dimension:
//!
//! - only high-signal keywords matched: `min(80 + 5·hits, 100)`
//! - only low-signal keywords matched: `max(20 − 5·hits, 0)`
//! - both or neither: neutral 50
//!
//! Avoidance is the one asymmetric case — it weighs avoidance hits against
//! approach hits instead of high against low.
//!
//! Extraction is pure: identical text and history always produce identical
//! scores, so sessions are replayable. A whitespace-only turn yields all
//! zeros regardless of history — the turn carried no signal, and neutral 50s
//! would fabricate some.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Dimension, DimensionScores};
use crate::session::{Role, Turn};

/// High/low keyword pair for one dimension.
struct Lexicon {
    high: &'static [&'static str],
    low: &'static [&'static str],
}

static ATTACHMENT: Lazy<Lexicon> = Lazy::new(|| Lexicon {
    high: &["아직도", "여전히", "지금도", "요즘도", "그리워", "보고싶어", "생각나"],
    low: &["이제", "더 이상", "신경 안 써", "관심 없어", "잊었어", "지나간 일"],
});

static REGRET: Lazy<Lexicon> = Lazy::new(|| Lexicon {
    high: &["미안해", "아쉬워", "후회돼", "잘못했어", "다시 돌아가면", "더 잘했으면"],
    low: &["후회 없어", "그때가 최선", "맞는 선택", "다시 돌아가도"],
});

static UNRESOLVED: Lazy<Lexicon> = Lazy::new(|| Lexicon {
    high: &["이해가 안 돼", "궁금해", "명확하지 않아", "끝나지 않은", "해결되지 않은"],
    low: &["이해했어", "정리됐어", "명확해", "해결됐어", "끝났어"],
});

static COMPARISON: Lazy<Lexicon> = Lazy::new(|| Lexicon {
    high: &["비교해", "그 사람만큼은", "이전과 비교하면", "새로운 사람과"],
    low: &["비교하지 않아", "각자 다른", "독립적으로", "별개로"],
});

/// Avoidance weighs these against [`APPROACH`] rather than a low set.
static AVOIDANCE: Lazy<&'static [&'static str]> =
    Lazy::new(|| &["피하고 싶어", "회피하고 싶어", "얘기 하기 싫어", "만나기 싫어"]);

static APPROACH: Lazy<&'static [&'static str]> =
    Lazy::new(|| &["만나고 싶어", "연락하고 싶어", "자연스럽게", "괜찮아"]);

/// Collapses whitespace runs so multi-word phrases match across line breaks.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Neutral score when a dimension has no (or conflicting) signal.
const NEUTRAL: f64 = 50.0;

/// Extracts per-dimension sub-scores from turn text and session history.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    /// How many recent user turns are folded into the analysis window.
    history_window: usize,
}

impl SignalExtractor {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Score one turn. Pure with respect to its inputs.
    ///
    /// Empty or whitespace-only `turn_text` yields all zeros, never an
    /// error.
    pub fn extract(&self, turn_text: &str, history: &[Turn]) -> DimensionScores {
        if turn_text.trim().is_empty() {
            return DimensionScores::default();
        }
        self.score_window(&self.analysis_window(turn_text, history, self.history_window))
    }

    /// Score over the entire session history plus the current turn.
    ///
    /// The final report pass uses this instead of [`extract`](Self::extract):
    /// a confession early in a long session must still show in the report,
    /// not fall out of the rolling window.
    pub fn extract_full(&self, turn_text: &str, history: &[Turn]) -> DimensionScores {
        if turn_text.trim().is_empty() && history.iter().all(|t| t.text.trim().is_empty()) {
            return DimensionScores::default();
        }
        self.score_window(&self.analysis_window(turn_text, history, usize::MAX))
    }

    fn score_window(&self, window: &str) -> DimensionScores {
        let mut scores = DimensionScores::default();
        scores.set(Dimension::Attachment, score_paired(window, &ATTACHMENT));
        scores.set(Dimension::Regret, score_paired(window, &REGRET));
        scores.set(Dimension::Unresolved, score_paired(window, &UNRESOLVED));
        scores.set(Dimension::Comparison, score_paired(window, &COMPARISON));
        scores.set(
            Dimension::Avoidance,
            score_opposed(window, &AVOIDANCE, &APPROACH),
        );
        scores
    }

    /// Current turn text plus the last `window` user turns, oldest first,
    /// whitespace-normalized.
    fn analysis_window(&self, turn_text: &str, history: &[Turn], window: usize) -> String {
        let mut recent: Vec<&str> = history
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .take(window)
            .map(|t| t.text.as_str())
            .collect();
        recent.reverse();
        recent.push(turn_text);

        WHITESPACE.replace_all(&recent.join(" "), " ").into_owned()
    }
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Count occurrences of each keyword that appears at least once.
fn hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| text.contains(*kw)).count()
}

/// Standard high-vs-low scoring rule.
fn score_paired(text: &str, lexicon: &Lexicon) -> f64 {
    let high = hits(text, lexicon.high);
    let low = hits(text, lexicon.low);

    if high > 0 && low == 0 {
        (80.0 + high as f64 * 5.0).min(100.0)
    } else if low > 0 && high == 0 {
        (20.0 - low as f64 * 5.0).max(0.0)
    } else {
        NEUTRAL
    }
}

/// Avoidance-vs-approach rule: whichever side dominates sets the direction.
fn score_opposed(text: &str, avoidance: &[&str], approach: &[&str]) -> f64 {
    let avoid = hits(text, avoidance);
    let appr = hits(text, approach);

    if avoid > appr {
        (80.0 + avoid as f64 * 5.0).min(100.0)
    } else if appr > avoid {
        (20.0 - appr as f64 * 5.0).max(0.0)
    } else {
        NEUTRAL
    }
}
