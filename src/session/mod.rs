//! Per-user conversation sessions.
//!
//! Sessions are keyed by username and live in a process-wide [`SessionStore`]
//! for the configured session horizon. Each session is wrapped in its own
//! `tokio::sync::Mutex`: turns within one session are strictly serialized
//! (score updates and phase transitions are order-dependent), while turns for
//! distinct sessions run fully in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::scoring::DimensionScores;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One immutable message exchange unit. Appended only, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke.
    pub role: Role,
    /// Message text.
    pub text: String,
    /// Visual asset reference attached to the turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Arrival-order sequence number within the session.
    pub seq: u64,
    /// Wall-clock time the turn was appended.
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, image: Option<String>, seq: u64) -> Self {
        Self {
            role,
            text: text.into(),
            image,
            seq,
            at: Utc::now(),
        }
    }
}

/// Orchestrator state governing turn-handling policy. Exactly one phase is
/// active per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Initial state, before the persona introduction.
    Greeting,
    /// Default steady state: probing and scoring.
    Collecting,
    /// Transient: forced aggregation pass on the way to a report.
    Analyzing,
    /// Emitting the tier report; returns to Collecting afterwards.
    Reporting,
    /// Side branch: packaging a program-recommendation redirect.
    Redirecting,
}

/// One user's conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// User key the session is registered under.
    pub username: String,
    /// Ordered, append-only turn history.
    pub turns: Vec<Turn>,
    /// Current orchestrator phase.
    pub phase: Phase,
    /// Running per-dimension scores.
    pub scores: DimensionScores,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            turns: Vec::new(),
            phase: Phase::Greeting,
            scores: DimensionScores::default(),
            created_at: Utc::now(),
        }
    }

    /// Append a turn, assigning the next sequence number.
    pub fn push_turn(&mut self, role: Role, text: impl Into<String>, image: Option<String>) {
        let seq = self.turns.len() as u64;
        self.turns.push(Turn::new(role, text, image, seq));
    }

    /// Move to a new phase, logging the transition.
    pub fn transition(&mut self, next: Phase) {
        if self.phase != next {
            log::debug!(
                "session '{}': phase {:?} -> {:?}",
                self.username,
                self.phase,
                next
            );
            self.phase = next;
        }
    }
}

/// Process-wide session registry keyed by username.
///
/// Injected into the orchestrator rather than held as ambient global state.
/// Entries are created on first contact and retained until explicitly
/// evicted.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for a user, creating it on first contact.
    pub fn get_or_create(&self, username: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(username))))
            .clone()
    }

    /// Drop a session, if present.
    pub fn evict(&self, username: &str) -> bool {
        self.sessions.remove(username).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_in_greeting() {
        let session = Session::new("지수");
        assert_eq!(session.phase, Phase::Greeting);
        assert!(session.turns.is_empty());
        assert!(session.scores.is_zero());
    }

    #[test]
    fn test_push_turn_sequences() {
        let mut session = Session::new("지수");
        session.push_turn(Role::User, "안녕", None);
        session.push_turn(Role::Bot, "반가워", Some("/img/a.png".into()));

        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].seq, 0);
        assert_eq!(session.turns[1].seq, 1);
        assert_eq!(session.turns[1].role, Role::Bot);
        assert_eq!(session.turns[1].image.as_deref(), Some("/img/a.png"));
    }

    #[tokio::test]
    async fn test_store_returns_same_session_per_key() {
        let store = SessionStore::new();
        let a = store.get_or_create("민수");
        let b = store.get_or_create("민수");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);

        let c = store.get_or_create("지수");
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_store_evict() {
        let store = SessionStore::new();
        store.get_or_create("민수");
        assert!(store.evict("민수"));
        assert!(!store.evict("민수"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_per_session_serialization() {
        let store = SessionStore::new();
        let session = store.get_or_create("민수");

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                let mut guard = session.lock().await;
                guard.push_turn(Role::User, format!("turn {}", i), None);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let guard = session.lock().await;
        assert_eq!(guard.turns.len(), 8);
        // Sequence numbers are dense regardless of task interleaving.
        for (i, turn) in guard.turns.iter().enumerate() {
            assert_eq!(turn.seq, i as u64);
        }
    }
}
