//! History storage interface and the in-memory implementation.
//!
//! Turns are stored immutably; they are never modified or deleted.

use crate::context::types::{format_timestamp, ConversationTurn, SessionSummary};
use crate::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::preview;

/// Append-only conversation log keyed by session id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a single turn to its session
    async fn append(&self, turn: ConversationTurn) -> Result<()>;

    /// Last `n` turns of a session in chronological order
    async fn recent(&self, session_id: &str, n: usize) -> Result<Vec<ConversationTurn>>;

    /// First `limit` turns of a session, oldest first
    async fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Sessions ordered by most recent activity
    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>>;
}

#[derive(Debug, Default)]
struct SessionLog {
    turns: Vec<ConversationTurn>,
    /// Global append sequence of the newest turn; breaks timestamp ties
    last_seq: u64,
}

/// In-memory implementation of HistoryStore.
///
/// Uses DashMap for concurrent access. Suitable for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    sessions: DashMap<String, SessionLog>,
    seq: AtomicU64,
}

impl InMemoryHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, turn: ConversationTurn) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(target = "history", session = %turn.session_id, role = turn.role.as_str(), "append");
        let mut log = self.sessions.entry(turn.session_id.clone()).or_default();
        log.turns.push(turn);
        log.last_seq = seq;
        Ok(())
    }

    async fn recent(&self, session_id: &str, n: usize) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|log| {
                let start = log.turns.len().saturating_sub(n);
                log.turns[start..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|log| log.turns.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let mut rows: Vec<(i64, u64, SessionSummary)> = self
            .sessions
            .iter()
            .filter(|e| !e.key().is_empty())
            .filter_map(|e| {
                let last = e.turns.last()?;
                Some((
                    last.timestamp_ms,
                    e.last_seq,
                    SessionSummary {
                        id: e.key().clone(),
                        last_message_at: Some(format_timestamp(last.timestamp_ms)),
                        last_message_preview: Some(preview(&last.content)),
                        message_count: e.turns.len(),
                    },
                ))
            })
            .collect();
        rows.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        rows.truncate(limit);
        debug!(target = "history", count = rows.len(), "listed sessions");
        Ok(rows.into_iter().map(|(_, _, s)| s).collect())
    }
}
