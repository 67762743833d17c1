//! # Miryeon
//!
//! A conversational engine that interviews a user about a past relationship
//! and scores a lingering-attachment ("미련") index across five weighted
//! emotional dimensions, grounding its replies in a passage similarity index.
//!
//! The crate is a library plus a small axum server binary: sessions live in
//! an in-process store, every turn flows through the orchestrator state
//! machine, and the HTTP boundary is a single JSON request/response per
//! turn.

pub mod config;
pub mod error;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod retrieval;
pub mod scoring;
pub mod server;
pub mod session;

pub use config::{EngineConfig, PersonaConfig};
pub use error::EngineError;
pub use orchestrator::{Orchestrator, TurnRequest, TurnResponse};
pub use retrieval::{KnowledgeIndex, Retriever};
pub use scoring::{DimensionScores, Tier};
pub use session::{Session, SessionStore};

/// Crate version, surfaced by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
