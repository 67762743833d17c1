//! miryeon HTTP server binary.
//!
//! Starts an axum HTTP server exposing the conversation engine: a health
//! probe and a single-turn chat endpoint.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `OPENAI_API_KEY` — required; backs embeddings and completion
//! - `OPENAI_BASE_URL` — override the API host
//! - `MIRYEON_INDEX` — knowledge index JSON path (default: data/index.json;
//!   a missing file starts the server ungrounded)
//! - `MIRYEON_PERSONA`, `MIRYEON_TOP_K`, `MIRYEON_SIMILARITY_THRESHOLD`,
//!   `MIRYEON_RETRIEVAL_TIMEOUT_MS`, `MIRYEON_GENERATION_TIMEOUT_MS`,
//!   `MIRYEON_HISTORY_WINDOW`, `MIRYEON_CLASSIFIER` — engine tunables
//! - `RUST_LOG` — tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use miryeon::llm::OpenAiCompletion;
use miryeon::retrieval::{KnowledgeIndex, OpenAiEmbeddings, Retriever};
use miryeon::server::{app_router, AppState};
use miryeon::{EngineConfig, Orchestrator};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,miryeon=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);

    let config = EngineConfig::from_env().expect("Invalid engine configuration");

    let embeddings = OpenAiEmbeddings::from_env().expect("Embedding provider configuration");
    let completion = OpenAiCompletion::from_env().expect("Completion provider configuration");

    let index_path =
        std::env::var("MIRYEON_INDEX").unwrap_or_else(|_| "data/index.json".to_string());
    let index = match KnowledgeIndex::load(&index_path) {
        Ok(index) => {
            tracing::info!("loaded {} passages from {}", index.len(), index_path);
            index
        }
        Err(err) => {
            tracing::warn!(
                "knowledge index unavailable at {} ({}), starting ungrounded",
                index_path,
                err
            );
            KnowledgeIndex::new()
        }
    };

    let retriever = Retriever::new(Arc::new(index), Arc::new(embeddings));
    let orchestrator = Orchestrator::new(config, retriever, Arc::new(completion));
    let state = AppState::new(Arc::new(orchestrator));

    let app = app_router(state);

    tracing::info!("miryeon server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health — liveness probe");
    tracing::info!("  POST /chat   — one conversation turn");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .await
        .expect("Server failed");
}
