//! Embedding providers for the retrieval layer.
//!
//! The index stores raw vectors; providers only turn text into vectors. The
//! default backend is any OpenAI-compatible embeddings API reached over
//! `reqwest`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

/// Default embedding model, matching the vectors the reference index was
/// built with.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Turns text into an embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;

    /// Embed multiple documents. Default implementation embeds sequentially;
    /// backends with a batch endpoint should override.
    async fn embed_batch(&self, documents: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        let mut out = Vec::with_capacity(documents.len());
        for doc in documents {
            out.push(self.embed(doc).await?);
        }
        Ok(out)
    }
}

/// OpenAI-compatible embeddings backend.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiEmbeddings {
    /// Create a provider against the given API key, defaulting model and
    /// base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Build from environment: `OPENAI_API_KEY`, optional
    /// `OPENAI_BASE_URL` and `MIRYEON_EMBEDDING_MODEL`.
    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EngineError::embedding("OPENAI_API_KEY is not set"))?;
        let mut provider = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            provider.base_url = base_url;
        }
        if let Ok(model) = std::env::var("MIRYEON_EMBEDDING_MODEL") {
            provider.model = model;
        }
        Ok(provider)
    }

    /// Override the embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::embedding("embeddings API returned no vectors"))
    }

    async fn embed_batch(&self, documents: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": documents,
        });

        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::embedding(format!("HTTP error: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::embedding(format!(
                "embeddings API returned {}: {}",
                status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::embedding(format!("JSON parse error: {}", e)))?;

        let data = json["data"]
            .as_array()
            .ok_or_else(|| EngineError::embedding("missing 'data' in embeddings response"))?;

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            let embedding = item["embedding"]
                .as_array()
                .ok_or_else(|| EngineError::embedding("missing 'embedding' in response item"))?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            vectors.push(embedding);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
pub mod testing {
    //! Deterministic in-process embedding for tests: a crude bag-of-bytes
    //! projection that keeps identical texts identical and related texts
    //! closer than unrelated ones.

    use super::*;

    /// Fixed-dimension hash embedding used across the test suite.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HashEmbeddings;

    pub fn hash_embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 32];
        for (i, byte) in text.bytes().enumerate() {
            vector[(byte as usize + i) % 32] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbeddings {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
            Ok(hash_embed(text))
        }
    }

    /// Provider that always fails, for degraded-path tests.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EngineError> {
            Err(EngineError::embedding("embedding backend unavailable"))
        }
    }
}
