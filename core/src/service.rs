// Chat service
//
// Pipeline boundary: one call per user turn. Wires the dialogue stages, the
// recommendation engine and the history store together and owns the slot state
// carried between the turns of each session.

use crate::context::memory::{DEFAULT_MESSAGE_LIMIT, DEFAULT_SESSION_LIST_LIMIT};
use crate::context::{ConversationTurn, ConversationWindow, HistoryStore, SessionSummary, StoredMessage};
use crate::dialogue::{
    evaluate, is_new_request, FieldQuestionAnswerer, FollowUpComposer, Intent, IntentClassifier,
    PipelineConfig, QueryInfo, SlotExtractor, REDIRECT_MESSAGE,
};
use crate::llm::CompletionPort;
use crate::recommend::{
    compose_conversation_aware_request, format_recommendation, Catalog, RecommendationEngine,
};
use crate::{AssistError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Reply to one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: String,
    pub session_id: String,
}

pub struct ChatService {
    catalog: Arc<Catalog>,
    history: Arc<dyn HistoryStore>,
    config: PipelineConfig,
    classifier: IntentClassifier,
    extractor: SlotExtractor,
    composer: FollowUpComposer,
    answerer: FieldQuestionAnswerer,
    engine: RecommendationEngine,
    /// Slots of the creation request in progress, per session.
    /// The mutex also serializes turns within a session.
    sessions: DashMap<String, Arc<Mutex<QueryInfo>>>,
}

impl ChatService {
    pub fn new(
        port: Arc<dyn CompletionPort>,
        catalog: Arc<Catalog>,
        history: Arc<dyn HistoryStore>,
        config: PipelineConfig,
    ) -> Self {
        let t = config.temperatures;
        Self {
            catalog,
            history,
            classifier: IntentClassifier::new(port.clone(), t.classification),
            extractor: SlotExtractor::new(port.clone(), t.extraction),
            composer: FollowUpComposer::new(port.clone(), t.follow_up),
            answerer: FieldQuestionAnswerer::new(port.clone(), t.answer),
            engine: RecommendationEngine::new(port, t),
            config,
            sessions: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Process one user turn.
    ///
    /// A missing or blank session id starts a new session. Both turns are appended to
    /// history only when a reply was produced.
    pub async fn handle_turn(&self, session_id: Option<&str>, utterance: &str) -> Result<TurnOutcome> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AssistError::InvalidInput("message is empty".into()));
        }
        let session_id = session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let cell = self.slot_cell(&session_id);
        let result = {
            let mut slots = cell.lock().await;
            self.run_turn(&session_id, utterance, &mut slots).await
        };
        self.release_idle(&session_id, cell);

        Ok(TurnOutcome {
            response: result?,
            session_id,
        })
    }

    async fn run_turn(&self, session_id: &str, utterance: &str, slots: &mut QueryInfo) -> Result<String> {
        let history = ConversationWindow::new(
            self.history
                .recent(session_id, self.config.history_turns)
                .await?,
        );
        debug!(target = "chat_service", session = %session_id, history = history.len(), "turn start");

        let response = match self.respond(utterance, &history, slots).await {
            Ok(text) => text,
            Err(e) => {
                error!(target = "chat_service", session = %session_id, error = %e, "turn failed");
                return Err(e);
            }
        };

        self.history
            .append(ConversationTurn::user(session_id, utterance))
            .await?;
        self.history
            .append(ConversationTurn::assistant(session_id, &response))
            .await?;
        Ok(response)
    }

    /// Sessions by most recent activity; `None` or zero means the default limit
    pub async fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<SessionSummary>> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_SESSION_LIST_LIMIT);
        self.history.list_sessions(limit).await
    }

    /// Messages of one session, oldest first
    pub async fn session_messages(&self, session_id: &str, limit: Option<usize>) -> Result<Vec<StoredMessage>> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AssistError::InvalidInput("session id is required".into()));
        }
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_MESSAGE_LIMIT);
        let turns = self.history.messages(session_id, limit).await?;
        Ok(turns.iter().map(StoredMessage::from).collect())
    }

    fn slot_cell(&self, session_id: &str) -> Arc<Mutex<QueryInfo>> {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Drop the slot cell of a session with nothing in progress and no turn waiting on it
    fn release_idle(&self, session_id: &str, cell: Arc<Mutex<QueryInfo>>) {
        let removed = self.sessions.remove_if(session_id, |_, v| {
            Arc::ptr_eq(v, &cell)
                && Arc::strong_count(v) == 2
                && v.try_lock().map(|slots| slots.is_empty()).unwrap_or(false)
        });
        if removed.is_some() {
            debug!(target = "chat_service", session = %session_id, "released idle session slots");
        }
    }

    /// Sessions currently holding slot state
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    async fn respond(
        &self,
        utterance: &str,
        history: &ConversationWindow,
        slots: &mut QueryInfo,
    ) -> Result<String> {
        let classification = self
            .classifier
            .classify(utterance, &history.tail(self.config.classification_window))
            .await;

        match classification.intent() {
            Intent::Irrelevant => {
                info!(target = "chat_service", "irrelevant message; redirecting");
                Ok(REDIRECT_MESSAGE.to_string())
            }
            Intent::FieldQuestion => {
                info!(target = "chat_service", "field question");
                self.answerer.answer(utterance).await
            }
            Intent::Creation => self.fill_slots(utterance, history, slots).await,
        }
    }

    async fn fill_slots(
        &self,
        utterance: &str,
        history: &ConversationWindow,
        slots: &mut QueryInfo,
    ) -> Result<String> {
        let fresh = is_new_request(utterance, history);
        let context = if fresh {
            history.tail(self.config.new_request_window)
        } else {
            history.tail(self.config.continuation_window)
        };

        *slots = self.extractor.extract(utterance, &context, slots, fresh).await;
        let gate = evaluate(slots);
        info!(
            target = "chat_service",
            fresh,
            complete = gate.complete,
            missing = ?gate.missing,
            "slots evaluated"
        );

        if !gate.complete {
            return Ok(self.composer.compose(slots, &gate).await);
        }

        // a fresh request does not carry the earlier conversation into selection
        let request_context = if fresh { ConversationWindow::empty() } else { context };
        let request_text = compose_conversation_aware_request(&request_context, utterance);
        let rec = self
            .engine
            .recommend(&self.catalog, &request_text, slots)
            .await?;

        *slots = QueryInfo::default();
        Ok(format_recommendation(&rec))
    }
}
