//! Conversation orchestrator.
//!
//! Drives the turn state machine: greeting, collecting, triggered analysis,
//! report delivery, and the recommendation side-branch. Owns the session
//! store and sequences scoring, retrieval, prompt assembly, and generation
//! for every inbound turn. A well-formed turn always produces a reply;
//! retrieval and generation failures degrade instead of propagating.

pub mod prompt;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ClassifierKind, EngineConfig};
use crate::intent::{
    IntentClassifier, KeywordIntentClassifier, ModelIntentClassifier, TurnIntent,
};
use crate::llm::CompletionProvider;
use crate::retrieval::{RetrievedPassage, Retriever};
use crate::scoring::{ReportGenerator, ScoreAggregator, SignalExtractor};
use crate::session::{Phase, Role, SessionStore};

/// Reply returned when the completion capability errors or times out.
pub const FALLBACK_REPLY: &str = "죄송해요, 일시적인 오류가 발생했어요. 다시 시도해주세요.";

/// Greeting trigger; the very first message clients send on session open.
const INIT_MESSAGE: &str = "init";

const RECOMMEND_POSITIVE_MESSAGE: &str = "야... 이제 넌 미련이 거의 없구나 잘됐다! 새로 \
     프로그램 기획하고 있는데 차라리 여기 한번 면접 볼래? 아무튼 오늘 얘기 나눠줘서 \
     고마워~!!ㅎㅎㅎㅎ";

const RECOMMEND_NEGATIVE_MESSAGE: &str = "아직 미련이 많이 남았네 ㅜㅜ 이번에 환승연애 \
     출연진 모집하고 있는데 X 번호 있으면 넘겨줘봐 우리가 연락해볼게! 오늘 얘기 나눠줘서 \
     고마워~!!ㅎㅎㅎ";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One inbound chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    pub username: String,
}

/// Redirect payload. When present the caller must treat it as overriding
/// every other response field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRecommendation {
    pub image: String,
    pub message: String,
    pub sentiment: String,
}

/// One outbound chat turn. `reply` is always present; the optional fields
/// are omitted from the wire when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_report_generation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_recommendation: Option<ProgramRecommendation>,
}

impl TurnResponse {
    fn plain(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            image: None,
            needs_report_generation: None,
            program_recommendation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    config: EngineConfig,
    sessions: SessionStore,
    extractor: SignalExtractor,
    aggregator: ScoreAggregator,
    reporter: ReportGenerator,
    retriever: Retriever,
    completion: Arc<dyn CompletionProvider>,
    classifier: Arc<dyn IntentClassifier>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        retriever: Retriever,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        let classifier: Arc<dyn IntentClassifier> = match config.classifier {
            ClassifierKind::Keyword => Arc::new(KeywordIntentClassifier),
            ClassifierKind::Model => Arc::new(ModelIntentClassifier::new(completion.clone())),
        };
        let extractor = SignalExtractor::new(config.history_window);
        Self {
            config,
            sessions: SessionStore::new(),
            extractor,
            aggregator: ScoreAggregator,
            reporter: ReportGenerator,
            retriever,
            completion,
            classifier,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one turn. The session lock is held for the whole turn, so
    /// turns within a session are strictly ordered while distinct sessions
    /// proceed in parallel.
    pub async fn handle_turn(&self, request: &TurnRequest) -> TurnResponse {
        let turn_id = Uuid::new_v4();
        let session = self.sessions.get_or_create(&request.username);
        let mut session = session.lock().await;

        let trimmed = request.message.trim();
        log::info!(
            "turn {} user={} phase={:?} len={}",
            turn_id,
            request.username,
            session.phase,
            trimmed.chars().count()
        );

        // Greeting: templated persona intro, no score mutation.
        if trimmed.eq_ignore_ascii_case(INIT_MESSAGE) {
            let reply = self.config.persona.render_greeting(&request.username);
            session.push_turn(Role::User, trimmed, None);
            session.push_turn(
                Role::Bot,
                &reply,
                Some(self.config.persona.main_image.clone()),
            );
            session.transition(Phase::Collecting);
            return TurnResponse {
                image: Some(self.config.persona.main_image.clone()),
                ..TurnResponse::plain(reply)
            };
        }

        let intent = if trimmed.is_empty() {
            TurnIntent::Report
        } else {
            self.classifier.classify(trimmed).await
        };

        match intent {
            TurnIntent::Recommendation => self.redirect(&mut session, trimmed),
            TurnIntent::Report => self.report(&mut session, &request.username, trimmed, turn_id),
            TurnIntent::Conversational => {
                self.converse(&mut session, trimmed, turn_id).await
            }
        }
    }

    /// Redirecting side-branch: package the program-recommendation payload.
    /// Never mutates the dimension scores.
    fn redirect(&self, session: &mut crate::session::Session, message: &str) -> TurnResponse {
        session.transition(Phase::Redirecting);
        let (composite, _) = self.aggregator.current(&session.scores);
        let (sentiment, image, closing) = if composite <= self.config.recommendation_pivot {
            (
                "positive",
                self.config.persona.recommend_positive_image.clone(),
                RECOMMEND_POSITIVE_MESSAGE,
            )
        } else {
            (
                "negative",
                self.config.persona.recommend_negative_image.clone(),
                RECOMMEND_NEGATIVE_MESSAGE,
            )
        };
        log::info!(
            "redirect user={} composite={:.1} sentiment={}",
            session.username,
            composite,
            sentiment
        );

        session.push_turn(Role::User, message, None);
        session.push_turn(Role::Bot, closing, Some(image.clone()));

        TurnResponse {
            program_recommendation: Some(ProgramRecommendation {
                image,
                message: closing.to_string(),
                sentiment: sentiment.to_string(),
            }),
            ..TurnResponse::plain(closing)
        }
    }

    /// Analyzing → Reporting pass. A keyword-triggered turn scores its own
    /// text first and advertises `needs_report_generation` for callers on
    /// the two-turn protocol; an empty message reports straight from the
    /// running scores without wiping them with zero deltas.
    fn report(
        &self,
        session: &mut crate::session::Session,
        username: &str,
        message: &str,
        turn_id: Uuid,
    ) -> TurnResponse {
        session.transition(Phase::Analyzing);
        let triggered_by_keyword = !message.is_empty();
        let (composite, tier) = if triggered_by_keyword {
            // Final pass over the whole transcript, so signal older than
            // the rolling window still counts in the report.
            let delta = self.extractor.extract_full(message, &session.turns);
            let mut scores = session.scores;
            let result = self.aggregator.apply(&mut scores, &delta);
            session.scores = scores;
            result
        } else {
            // Forced pass: zero deltas from the empty turn must not wipe
            // the running scores, so aggregate without applying.
            self.aggregator.current(&session.scores)
        };
        log::info!(
            "turn {} report forced={} composite={:.1} tier={}",
            turn_id,
            !triggered_by_keyword,
            composite,
            tier.label()
        );

        session.transition(Phase::Reporting);
        let scores = session.scores;
        let report = self.reporter.render(username, &scores);
        session.push_turn(Role::User, message, None);
        session.push_turn(
            Role::Bot,
            &report,
            Some(self.config.persona.report_image.clone()),
        );
        // Reports are repeatable; the interview keeps going.
        session.transition(Phase::Collecting);

        TurnResponse {
            image: Some(self.config.persona.report_image.clone()),
            needs_report_generation: triggered_by_keyword.then_some(true),
            ..TurnResponse::plain(report)
        }
    }

    /// Ordinary Collecting turn: commit scores, retrieve grounding, build
    /// the prompt, and generate. Scores commit before generation so a
    /// generation failure never loses the analysis.
    async fn converse(
        &self,
        session: &mut crate::session::Session,
        message: &str,
        turn_id: Uuid,
    ) -> TurnResponse {
        session.transition(Phase::Collecting);

        let delta = self.extractor.extract(message, &session.turns);
        let mut scores = session.scores;
        let (composite, tier) = self.aggregator.apply(&mut scores, &delta);
        session.scores = scores;
        log::debug!(
            "turn {} scored composite={:.1} tier={}",
            turn_id,
            composite,
            tier.label()
        );

        let grounding = self.retrieve_grounding(message, turn_id).await;

        let messages = prompt::build_messages(
            &self.config.persona,
            &session.turns,
            &grounding,
            &session.scores,
            message,
            self.config.history_window,
        );

        let reply = match tokio::time::timeout(
            self.config.generation_timeout,
            self.completion.complete(&messages),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                log::error!("turn {} generation failed: {}", turn_id, err);
                FALLBACK_REPLY.to_string()
            }
            Err(_) => {
                log::error!("turn {} generation timed out", turn_id);
                FALLBACK_REPLY.to_string()
            }
        };

        session.push_turn(Role::User, message, None);
        session.push_turn(Role::Bot, &reply, None);
        TurnResponse::plain(reply)
    }

    /// Best-effort grounding lookup. Misses, backend errors, and timeouts
    /// all degrade to an empty context.
    async fn retrieve_grounding(&self, query: &str, turn_id: Uuid) -> Vec<RetrievedPassage> {
        match tokio::time::timeout(
            self.config.retrieval_timeout,
            self.retriever.retrieve(
                query,
                self.config.retrieval_top_k,
                self.config.similarity_threshold,
            ),
        )
        .await
        {
            Ok(Ok(passages)) => passages,
            Ok(Err(err)) => {
                log::warn!("turn {} retrieval failed, proceeding ungrounded: {}", turn_id, err);
                Vec::new()
            }
            Err(_) => {
                log::warn!("turn {} retrieval timed out, proceeding ungrounded", turn_id);
                Vec::new()
            }
        }
    }
}
