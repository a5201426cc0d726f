use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Which producer a message came from.
///
/// Purely presentational: nothing in the store or the reconciler branches on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Typed by the user
    #[default]
    User,
    /// One-shot backend
    Batch,
    /// Streaming backend that did not identify its model
    Stream,
    /// Streaming backend that identified itself as the live model
    Live,
    /// Produced locally to report a failure
    Error,
}

/// A single chat message within a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message (empty while a streamed reply has not started)
    #[serde(default)]
    pub content: String,
    /// Producer of the message
    #[serde(default)]
    pub origin: Origin,
    /// When the message was appended
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            origin: Origin::User,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message tagged with its producer
    pub fn assistant(content: impl Into<String>, origin: Origin) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            origin,
            created_at: Utc::now(),
        }
    }

    /// Create a synthetic assistant message reporting a failure
    pub fn error(content: impl Into<String>) -> Self {
        Self::assistant(content, Origin::Error)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    pub fn is_error(&self) -> bool {
        self.origin == Origin::Error
    }
}
