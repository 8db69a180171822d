//! History subsystem: append-only conversation logs keyed by session.

pub mod persistent;
pub mod store;

pub use persistent::RocksDbHistory;
pub use store::{HistoryStore, InMemoryHistory};

/// Sessions listed when the caller passes no usable limit
pub const DEFAULT_SESSION_LIST_LIMIT: usize = 50;
/// Messages returned when the caller passes no usable limit
pub const DEFAULT_MESSAGE_LIMIT: usize = 100;
/// Characters kept in a session's last-message preview
pub const PREVIEW_CHARS: usize = 120;

pub(crate) fn preview(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let mut s: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        s.push_str("...");
        s
    }
}
