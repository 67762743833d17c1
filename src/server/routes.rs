//! Axum route handlers for the miryeon HTTP server.
//!
//! # Routes
//!
//! - `GET  /health` — Returns `{"status": "ok", "version": ..., "service": ...}`
//! - `POST /chat`   — Accepts `TurnRequest`, runs one conversation turn

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::{Orchestrator, TurnRequest, TurnResponse};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// The conversation engine behind every /chat turn.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "miryeon",
    }))
}

/// POST /chat — run one conversation turn.
///
/// Request:  `TurnRequest`  = `{ "message": string, "username": string }`
/// Response: `TurnResponse` = `{ "reply", "image"?, "needs_report_generation"?,
///           "program_recommendation"? }`
///
/// Structurally missing fields are rejected by the extractor before this
/// handler runs; an empty username is rejected here. A well-formed request
/// always gets a 200 with a reply, whatever happens inside the engine.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, (StatusCode, Json<Value>)> {
    if request.username.trim().is_empty() {
        let err = crate::error::EngineError::InvalidRequest {
            message: "username must not be empty".to_string(),
        };
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": err.to_string(),
            })),
        ));
    }

    let response = state.orchestrator.handle_turn(&request).await;
    Ok(Json(response))
}
