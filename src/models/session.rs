use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// Format used for session titles
const TITLE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One independent, persisted conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Opaque identifier, never changes after creation
    pub id: String,
    /// Human-readable creation time
    pub title: String,
    /// When the session was created, used for ordering
    pub created_at: DateTime<Utc>,
    /// Messages in append order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session with the given id, titled after the current time
    pub fn new(id: impl Into<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id: id.into(),
            title: created_at.with_timezone(&Local).format(TITLE_FORMAT).to_string(),
            created_at,
            messages: Vec::new(),
        }
    }

    /// Index of the last assistant message, if any
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_assistant)
    }

    /// Lightweight view for listings
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            message_count: self.messages.len(),
        }
    }
}

/// Listing entry for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Generate a new session identifier.
///
/// Wall-clock milliseconds followed by a random v4 UUID, e.g.
/// `1760870400000-3f2b9c1e8d7a4b6c9e0f1a2b3c4d5e6f`.
pub fn generate_session_id() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}
