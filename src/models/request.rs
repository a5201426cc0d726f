use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Message, MessageRole};

/// Which backend protocol a user action is sent through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Incremental line-delimited JSON stream
    Live,
    /// Single JSON response
    #[default]
    Batch,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Live => write!(f, "live"),
            ChatMode::Batch => write!(f, "batch"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "stream" => Ok(ChatMode::Live),
            "batch" => Ok(ChatMode::Batch),
            other => Err(format!("unknown mode '{}' (expected live or batch)", other)),
        }
    }
}

/// Message as it appears on the wire: role and content only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /completions/batch`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
}

/// Body of `POST /completions/live`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LiveRequest {
    pub model: String,
    pub session_id: String,
    pub messages: Vec<WireMessage>,
}

/// Everything a backend driver needs for one user action
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Session the action belongs to
    pub session_id: String,
    /// Messages already in the session before this action
    pub history: Vec<Message>,
    /// The new user message
    pub message: Message,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, history: Vec<Message>, message: Message) -> Self {
        Self {
            session_id: session_id.into(),
            history,
            message,
        }
    }

    /// Prior history followed by the new message, in wire form
    pub fn wire_messages(&self) -> Vec<WireMessage> {
        self.history
            .iter()
            .chain(std::iter::once(&self.message))
            .map(WireMessage::from)
            .collect()
    }
}
