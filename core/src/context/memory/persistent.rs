//! Persistent RocksDB-based history store.
//!
//! Same contract as `InMemoryHistory`, persisted to disk so sessions survive restarts.

use crate::context::types::{format_timestamp, ConversationTurn, SessionSummary};
use crate::{AssistError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{preview, HistoryStore};

/// Column family names
const CF_TURNS: &str = "turns";
const CF_SESSIONS: &str = "sessions";

/// Per-session bookkeeping kept next to the turns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionMeta {
    count: u64,
    last_timestamp_ms: i64,
    last_seq: u64,
    last_content: String,
}

/// Persistent RocksDB-based implementation of HistoryStore.
///
/// Column families:
/// - `turns`: `{session}\0{index:020}` -> ConversationTurn (JSON)
/// - `sessions`: `{session}` -> SessionMeta (JSON)
pub struct RocksDbHistory {
    db: DB,
    /// Global append sequence; also serializes read-modify-write of session meta
    seq: Mutex<u64>,
}

impl RocksDbHistory {
    /// Open (or create) a history store at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_TURNS, Options::default()),
            ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| AssistError::Persistence(e.to_string()))?;

        let mut store = Self {
            db,
            seq: Mutex::new(0),
        };
        let last_seq = store
            .all_sessions()?
            .iter()
            .map(|(_, m)| m.last_seq)
            .max()
            .unwrap_or(0);
        store.seq = Mutex::new(last_seq);

        info!(target = "history", last_seq, "RocksDbHistory initialized");
        Ok(Arc::new(store))
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| AssistError::Persistence(format!("Missing CF: {}", name)))
    }

    fn turn_key(session_id: &str, index: u64) -> Vec<u8> {
        format!("{}\0{:020}", session_id, index).into_bytes()
    }

    fn session_prefix(session_id: &str) -> Vec<u8> {
        format!("{}\0", session_id).into_bytes()
    }

    fn session_meta(&self, session_id: &str) -> Result<Option<SessionMeta>> {
        let cf = self.cf(CF_SESSIONS)?;
        match self.db.get_cf(cf, session_id) {
            Ok(Some(data)) => Ok(Some(serde_json::from_slice(&data)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AssistError::Persistence(e.to_string())),
        }
    }

    fn all_sessions(&self) -> Result<Vec<(String, SessionMeta)>> {
        let cf = self.cf(CF_SESSIONS)?;
        let mut out = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = entry.map_err(|e| AssistError::Persistence(e.to_string()))?;
            let id = String::from_utf8_lossy(&key).into_owned();
            out.push((id, serde_json::from_slice(&value)?));
        }
        Ok(out)
    }

    /// Read up to `limit` turns of a session starting at `from`
    fn scan_turns(&self, session_id: &str, from: u64, limit: usize) -> Result<Vec<ConversationTurn>> {
        let cf = self.cf(CF_TURNS)?;
        let prefix = Self::session_prefix(session_id);
        let start = Self::turn_key(session_id, from);
        let mut out = Vec::new();
        for entry in self
            .db
            .iterator_cf(cf, IteratorMode::From(&start[..], Direction::Forward))
        {
            if out.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(|e| AssistError::Persistence(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl HistoryStore for RocksDbHistory {
    async fn append(&self, turn: ConversationTurn) -> Result<()> {
        let mut seq = self.seq.lock().await;
        let mut meta = self.session_meta(&turn.session_id)?.unwrap_or_default();

        *seq += 1;
        let key = Self::turn_key(&turn.session_id, meta.count);
        meta.count += 1;
        meta.last_timestamp_ms = turn.timestamp_ms;
        meta.last_seq = *seq;
        meta.last_content = turn.content.clone();

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_TURNS)?, key, serde_json::to_vec(&turn)?);
        batch.put_cf(
            self.cf(CF_SESSIONS)?,
            turn.session_id.as_bytes(),
            serde_json::to_vec(&meta)?,
        );
        self.db
            .write(batch)
            .map_err(|e| AssistError::Persistence(e.to_string()))?;

        debug!(target = "history", session = %turn.session_id, count = meta.count, "Stored turn");
        Ok(())
    }

    async fn recent(&self, session_id: &str, n: usize) -> Result<Vec<ConversationTurn>> {
        let Some(meta) = self.session_meta(session_id)? else {
            return Ok(Vec::new());
        };
        let from = meta.count.saturating_sub(n as u64);
        self.scan_turns(session_id, from, n)
    }

    async fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        self.scan_turns(session_id, 0, limit)
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
        let mut sessions: Vec<(String, SessionMeta)> = self
            .all_sessions()?
            .into_iter()
            .filter(|(id, m)| !id.is_empty() && m.count > 0)
            .collect();
        sessions.sort_by(|(_, a), (_, b)| {
            (b.last_timestamp_ms, b.last_seq).cmp(&(a.last_timestamp_ms, a.last_seq))
        });
        sessions.truncate(limit);

        Ok(sessions
            .into_iter()
            .map(|(id, m)| SessionSummary {
                id,
                last_message_at: Some(format_timestamp(m.last_timestamp_ms)),
                last_message_preview: Some(preview(&m.last_content)),
                message_count: m.count as usize,
            })
            .collect())
    }
}
