//! Session store
//!
//! Owns every session and the current-session pointer. Each mutation writes the
//! whole snapshot through the persistence port before returning, so a reload
//! reconstructs identical state.

mod message;
mod session;

use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::models::{Message, Session, SessionSummary};
use crate::traits::{SessionPersistence, SnapshotRef, StoreSnapshot};

/// Durable map of session id → session, plus the current session id.
pub struct SessionStore {
    /// Sessions indexed by id
    pub(crate) sessions: HashMap<String, Session>,
    /// Id of the session the user is looking at
    pub(crate) current_id: String,
    /// Where snapshots go
    persistence: Box<dyn SessionPersistence>,
    /// Set when the last save failed and the medium is behind memory
    dirty: bool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("current_id", &self.current_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl SessionStore {
    /// Load the store from `persistence`.
    ///
    /// A snapshot that cannot be read is logged and treated as empty. The current
    /// pointer is the saved id, else the most recent session, else a new session.
    pub fn open(persistence: impl SessionPersistence + 'static) -> Self {
        let snapshot = match persistence.load() {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!("Could not load saved sessions, starting empty: {}", e);
                StoreSnapshot::default()
            }
        };

        let mut store = Self {
            sessions: snapshot.sessions,
            current_id: String::new(),
            persistence: Box::new(persistence),
            dirty: false,
        };

        let current_id = snapshot
            .current_session_id
            .or_else(|| store.most_recent_id())
            .unwrap_or_else(crate::models::generate_session_id);
        debug!(
            "Opened session store with {} sessions, current {}",
            store.sessions.len(),
            current_id
        );
        store.current_id = current_id;
        store.ensure_current();
        store
    }

    /// Id of the current session.
    pub fn current_session_id(&self) -> &str {
        &self.current_id
    }

    /// The current session.
    ///
    /// Every mutation re-establishes the pointer, so the lookup only misses if
    /// the map was edited behind the store's back.
    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.get(&self.current_id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Messages of a session, empty if it does not exist.
    pub fn messages(&self, id: &str) -> &[Message] {
        self.sessions
            .get(id)
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions newest first; equal timestamps ordered by id.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sorted_sessions()
            .into_iter()
            .map(Session::summary)
            .collect()
    }

    /// Whether the last save failed and has not been retried successfully.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Retry a failed save. Returns `true` once the medium is up to date.
    pub fn flush(&mut self) -> bool {
        if self.dirty {
            self.persist();
        }
        !self.dirty
    }

    /// Owned copy of the full state, as it would be persisted.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot_ref().to_owned_snapshot()
    }

    fn snapshot_ref(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            sessions: &self.sessions,
            current_session_id: &self.current_id,
        }
    }

    pub(crate) fn sorted_sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        sessions
    }

    pub(crate) fn most_recent_id(&self) -> Option<String> {
        self.sorted_sessions().first().map(|s| s.id.clone())
    }

    /// Write the whole snapshot. Failures leave memory untouched and mark the
    /// store dirty so the next mutation (or `flush`) tries again.
    pub(crate) fn persist(&mut self) {
        match self.persistence.save(self.snapshot_ref()) {
            Ok(()) => {
                if self.dirty {
                    debug!("Session store caught up with persistence");
                }
                self.dirty = false;
            }
            Err(e) => {
                error!("Failed to persist sessions: {}", e);
                self.dirty = true;
            }
        }
    }
}
