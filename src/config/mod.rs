//! Engine and persona configuration.
//!
//! Two layers, mirroring how the service is deployed:
//!
//! - [`PersonaConfig`] — who the bot is. Loaded from a JSON file
//!   (`config/persona.json` by default) with a built-in fallback so the
//!   engine always starts, even on a fresh checkout.
//! - [`EngineConfig`] — the tunables: retrieval threshold/top-k, call
//!   timeouts, history window, classifier selection. Read from environment
//!   variables with sensible defaults.
//!
//! Scoring weights and tier band boundaries are deliberately *not* here;
//! they are named constants in [`crate::scoring`] because they define the
//! meaning of the composite index, not a deployment knob.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Which intent classifier implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Keyword-set matcher (default, no external calls).
    Keyword,
    /// Model-based classifier via the completion capability.
    Model,
}

impl Default for ClassifierKind {
    fn default() -> Self {
        Self::Keyword
    }
}

/// System prompt material for the persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPromptConfig {
    /// Base persona statement.
    pub base: String,
    /// Conversational rules appended as a bullet list.
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Persona definition: name, framing, prompt material, and the image assets
/// the chat widget renders next to replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the bot persona.
    pub name: String,
    /// Short description of the persona framing.
    pub description: String,
    /// System prompt configuration.
    pub system_prompt: SystemPromptConfig,
    /// Greeting template; `{username}` is substituted.
    pub greeting: String,
    /// Portrait shown with the greeting.
    pub main_image: String,
    /// Portrait pinned while a report is displayed.
    pub report_image: String,
    /// Image attached to a positive-sentiment program recommendation.
    pub recommend_positive_image: String,
    /// Image attached to a negative-sentiment program recommendation.
    pub recommend_negative_image: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "환승연애 PD 친구".to_string(),
            description: "환승연애팀 막내 PD가 된 친구".to_string(),
            system_prompt: SystemPromptConfig {
                base: "당신은 환승연애팀 막내 PD가 된 친구입니다. 사용자와 반말로 자연스럽게 \
                       대화하며, 연애 이야기를 듣고 미련도를 분석해주는 역할을 합니다."
                    .to_string(),
                rules: vec![
                    "친구처럼 편하게 반말로 대화해".to_string(),
                    "연애 이야기를 자연스럽게 이끌어내되, 무리하게 끌어내지 마".to_string(),
                    "너무 상세하게 계속 물어보지 말고, 적당한 타이밍에 다른 주제로 넘어가"
                        .to_string(),
                    "이모티콘은 최소한으로 사용해".to_string(),
                ],
            },
            greeting: "야, {username}! 나 이번에 환승연애 팀 막내 PD 됐잖아. 지금 'X와의 \
                       미련도 측정 AI' 기획 중인데 네 얘기가 딱이야. 부담 갖지 말고 옛날 \
                       얘기하듯이 편하게 말해줘. 너 예전에 그 X랑 있었던 일 얘기해줄 수 있어?"
                .to_string(),
            main_image: "/static/images/chatbot/01_main.png".to_string(),
            report_image: "/static/images/chatbot/01_smile.png".to_string(),
            recommend_positive_image: "/static/images/chatbot/regretX_program.png".to_string(),
            recommend_negative_image: "/static/images/chatbot/regretO_program.png".to_string(),
        }
    }
}

impl PersonaConfig {
    /// Load a persona from a JSON file, falling back to [`Default`] when the
    /// file is missing. A present-but-malformed file is an error: silently
    /// swapping personas mid-deploy is worse than failing to start.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "persona config not found at {}, using built-in default",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Render the greeting for a given username.
    pub fn render_greeting(&self, username: &str) -> String {
        self.greeting.replace("{username}", username)
    }
}

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Persona definition.
    pub persona: PersonaConfig,
    /// Maximum passages returned per retrieval.
    pub retrieval_top_k: usize,
    /// Minimum similarity for a passage to count as grounding. Low values
    /// admit topically unrelated passages, which skews generation.
    pub similarity_threshold: f64,
    /// Bound on a retrieval round-trip; a timeout degrades to no grounding.
    pub retrieval_timeout: Duration,
    /// Bound on a completion round-trip; a timeout degrades to the fallback
    /// reply.
    pub generation_timeout: Duration,
    /// How many recent user turns the extractor folds into its analysis
    /// window.
    pub history_window: usize,
    /// Which intent classifier to use.
    pub classifier: ClassifierKind,
    /// Composite index at or below which a program recommendation carries
    /// positive sentiment.
    pub recommendation_pivot: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persona: PersonaConfig::default(),
            retrieval_top_k: 5,
            similarity_threshold: 0.7,
            retrieval_timeout: Duration::from_secs(8),
            generation_timeout: Duration::from_secs(20),
            history_window: 6,
            classifier: ClassifierKind::default(),
            recommendation_pivot: 50.0,
        }
    }
}

impl EngineConfig {
    /// Build the configuration from environment variables.
    ///
    /// - `MIRYEON_PERSONA` — persona JSON path (default `config/persona.json`)
    /// - `MIRYEON_TOP_K`, `MIRYEON_SIMILARITY_THRESHOLD`
    /// - `MIRYEON_RETRIEVAL_TIMEOUT_MS`, `MIRYEON_GENERATION_TIMEOUT_MS`
    /// - `MIRYEON_HISTORY_WINDOW`
    /// - `MIRYEON_CLASSIFIER` — "keyword" or "model"
    pub fn from_env() -> Result<Self, EngineError> {
        let defaults = Self::default();
        let persona_path = std::env::var("MIRYEON_PERSONA")
            .unwrap_or_else(|_| "config/persona.json".to_string());

        Ok(Self {
            persona: PersonaConfig::load(persona_path)?,
            retrieval_top_k: env_parse("MIRYEON_TOP_K", defaults.retrieval_top_k),
            similarity_threshold: env_parse(
                "MIRYEON_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            ),
            retrieval_timeout: Duration::from_millis(env_parse(
                "MIRYEON_RETRIEVAL_TIMEOUT_MS",
                defaults.retrieval_timeout.as_millis() as u64,
            )),
            generation_timeout: Duration::from_millis(env_parse(
                "MIRYEON_GENERATION_TIMEOUT_MS",
                defaults.generation_timeout.as_millis() as u64,
            )),
            history_window: env_parse("MIRYEON_HISTORY_WINDOW", defaults.history_window),
            classifier: match std::env::var("MIRYEON_CLASSIFIER").as_deref() {
                Ok("model") => ClassifierKind::Model,
                _ => ClassifierKind::Keyword,
            },
            recommendation_pivot: defaults.recommendation_pivot,
        })
    }
}

/// Parse an environment variable, falling back on absence or parse failure.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_persona_default_has_prompt_material() {
        let persona = PersonaConfig::default();
        assert!(!persona.system_prompt.base.is_empty());
        assert!(!persona.system_prompt.rules.is_empty());
        assert!(persona.greeting.contains("{username}"));
    }

    #[test]
    fn test_render_greeting_substitutes_username() {
        let persona = PersonaConfig::default();
        let greeting = persona.render_greeting("지수");
        assert!(greeting.contains("지수"));
        assert!(!greeting.contains("{username}"));
    }

    #[test]
    fn test_persona_load_missing_file_falls_back() {
        let persona = PersonaConfig::load("/nonexistent/persona.json").unwrap();
        assert_eq!(persona.name, PersonaConfig::default().name);
    }

    #[test]
    fn test_persona_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "name": "테스트 봇",
            "description": "테스트",
            "system_prompt": {"base": "너는 테스트 봇이야.", "rules": []},
            "greeting": "안녕 {username}!",
            "main_image": "/img/main.png",
            "report_image": "/img/report.png",
            "recommend_positive_image": "/img/pos.png",
            "recommend_negative_image": "/img/neg.png",
        });
        write!(file, "{}", json).unwrap();

        let persona = PersonaConfig::load(file.path()).unwrap();
        assert_eq!(persona.name, "테스트 봇");
        assert_eq!(persona.render_greeting("민수"), "안녕 민수!");
    }

    #[test]
    fn test_persona_load_malformed_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(PersonaConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.retrieval_top_k, 5);
        assert!(config.similarity_threshold >= 0.7);
        assert_eq!(config.classifier, ClassifierKind::Keyword);
    }
}
