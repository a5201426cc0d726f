//! Persistence port for the session store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::models::Session;

/// Key holding the serialized session map
pub const SESSIONS_KEY: &str = "sessions";
/// Key holding the serialized current-session id
pub const CURRENT_SESSION_KEY: &str = "current_session";

/// Everything the store persists: the full map plus the current pointer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSnapshot {
    pub sessions: HashMap<String, Session>,
    pub current_session_id: Option<String>,
}

/// Borrowed view of the store handed to [`SessionPersistence::save`], so a
/// write does not have to clone every session first.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SnapshotRef<'a> {
    pub sessions: &'a HashMap<String, Session>,
    pub current_session_id: &'a str,
}

impl SnapshotRef<'_> {
    pub fn to_owned_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.clone(),
            current_session_id: Some(self.current_session_id.to_string()),
        }
    }
}

/// Durable storage for the session store.
///
/// Calls are synchronous; the store invokes `save` after every mutation.
pub trait SessionPersistence: Send {
    /// Read the last saved snapshot, `None` on first launch.
    fn load(&self) -> Result<Option<StoreSnapshot>, StorageError>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: SnapshotRef<'_>) -> Result<(), StorageError>;
}
