//! Opaque text-completion capability.
//!
//! The orchestrator treats generation as a black box: a system prompt plus a
//! message transcript in, reply text out. The concrete backend is any
//! OpenAI-compatible chat-completions API. Failures are typed; the
//! orchestrator maps them to the fallback reply rather than failing the turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// One message in a completion transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant".
    pub role: String,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Text-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce a reply for the given transcript. The first message is
    /// expected to carry the system prompt.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, EngineError>;
}

/// OpenAI-compatible chat-completions backend.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    http: reqwest::Client,
}

impl OpenAiCompletion {
    /// Create a provider with default model and generation parameters.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            http: reqwest::Client::new(),
        }
    }

    /// Build from environment: `OPENAI_API_KEY`, optional `OPENAI_BASE_URL`
    /// and `MIRYEON_CHAT_MODEL`.
    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EngineError::completion("OPENAI_API_KEY is not set"))?;
        let mut provider = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            provider.base_url = base_url;
        }
        if let Ok(model) = std::env::var("MIRYEON_CHAT_MODEL") {
            provider.model = model;
        }
        Ok(provider)
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, EngineError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::completion(format!("HTTP error: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::completion(format!(
                "completions API returned {}: {}",
                status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::completion(format!("JSON parse error: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| EngineError::completion("no content in completion response"))
    }
}
