//! Turn-intent classification.
//!
//! Decides whether a user turn is asking for the analysis report, asking for
//! a program recommendation, or just conversing. Two interchangeable
//! implementations sit behind [`IntentClassifier`]: a keyword-set matcher
//! (the default, no external calls) and a model-based classifier that asks
//! the completion capability. Selection is configuration, not a hard-coded
//! branch.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::llm::{ChatMessage, CompletionProvider};

/// What a user turn is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnIntent {
    /// Keep the interview going.
    Conversational,
    /// Surface the emotion report.
    Report,
    /// Redirect to the program-recommendation flow.
    Recommendation,
}

/// Classifies a user turn's intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, turn_text: &str) -> TurnIntent;
}

// ---------------------------------------------------------------------------
// Keyword matcher
// ---------------------------------------------------------------------------

/// Korean report-trigger substrings.
const REPORT_KEYWORDS: &[&str] = &["분석", "리포트", "결과", "어때", "어떤"];

/// Korean recommendation substrings.
const RECOMMEND_KEYWORDS: &[&str] = &["추천"];

/// English triggers matched on word boundaries, so "reportedly" does not
/// trip the report flow.
static REPORT_EN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(analyz|analys|report|result)").expect("static regex"));

static RECOMMEND_EN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\brecommend").expect("static regex"));

/// Default keyword-set classifier.
///
/// Recommendation wins over report when both match: a user asking "추천
/// 결과 알려줘" wants the redirect, and the redirect overrides everything
/// else in the response contract anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, turn_text: &str) -> TurnIntent {
        if RECOMMEND_KEYWORDS.iter().any(|kw| turn_text.contains(kw))
            || RECOMMEND_EN.is_match(turn_text)
        {
            return TurnIntent::Recommendation;
        }
        if REPORT_KEYWORDS.iter().any(|kw| turn_text.contains(kw))
            || REPORT_EN.is_match(turn_text)
        {
            return TurnIntent::Report;
        }
        TurnIntent::Conversational
    }
}

// ---------------------------------------------------------------------------
// Model-based classifier
// ---------------------------------------------------------------------------

const CLASSIFIER_PROMPT: &str = "You label chat messages from a relationship interview. \
Reply with exactly one word: REPORT if the user is asking for their analysis result, \
RECOMMEND if the user is asking for a program recommendation, OTHER otherwise.";

/// Asks the completion capability to label the turn. Any backend failure or
/// unparseable label degrades to [`TurnIntent::Conversational`] — intent
/// detection must never take a turn down.
pub struct ModelIntentClassifier {
    provider: std::sync::Arc<dyn CompletionProvider>,
}

impl ModelIntentClassifier {
    pub fn new(provider: std::sync::Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl IntentClassifier for ModelIntentClassifier {
    async fn classify(&self, turn_text: &str) -> TurnIntent {
        let messages = vec![
            ChatMessage::system(CLASSIFIER_PROMPT),
            ChatMessage::user(turn_text),
        ];
        match self.provider.complete(&messages).await {
            Ok(label) => match label.trim().to_ascii_uppercase().as_str() {
                "REPORT" => TurnIntent::Report,
                "RECOMMEND" => TurnIntent::Recommendation,
                _ => TurnIntent::Conversational,
            },
            Err(err) => {
                log::warn!("intent classifier fell back to keyword-free default: {}", err);
                TurnIntent::Conversational
            }
        }
    }
}
