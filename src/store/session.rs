//! Session lifecycle methods for SessionStore

use tracing::{debug, info};

use crate::models::{generate_session_id, Session};

use super::SessionStore;

impl SessionStore {
    /// Make sure the current id maps to a session, creating an empty one if not.
    pub fn ensure_current(&mut self) {
        let id = self.current_id.clone();
        self.ensure_session(&id);
        self.persist();
    }

    /// Create an empty session, make it current and return its id.
    pub fn create_session(&mut self) -> String {
        let id = generate_session_id();
        self.sessions.insert(id.clone(), Session::new(id.clone()));
        self.current_id = id.clone();
        info!("Created session {}", id);
        self.ensure_current();
        id
    }

    /// Point the store at `id`. An unknown id is materialized as an empty session.
    pub fn switch_session(&mut self, id: &str) {
        debug!("Switching to session {}", id);
        self.current_id = id.to_string();
        self.ensure_current();
    }

    /// Delete a session. Returns `false` if it did not exist.
    ///
    /// When the current session is deleted, the most recently created remaining
    /// session becomes current, or a fresh one is created if none remain. The
    /// removal and the new pointer are saved in one write.
    pub fn delete_session(&mut self, id: &str) -> bool {
        if self.sessions.remove(id).is_none() {
            return false;
        }
        info!("Deleted session {}", id);

        if self.current_id == id {
            self.current_id = match self.most_recent_id() {
                Some(next) => next,
                None => {
                    let fresh = generate_session_id();
                    self.sessions.insert(fresh.clone(), Session::new(fresh.clone()));
                    fresh
                }
            };
            debug!("Current session is now {}", self.current_id);
        }

        self.ensure_current();
        true
    }

    /// Insert an empty session under `id` if it is missing. Does not persist.
    pub(crate) fn ensure_session(&mut self, id: &str) -> &mut Session {
        self.sessions.entry(id.to_string()).or_insert_with(|| {
            debug!("Materializing empty session {}", id);
            Session::new(id)
        })
    }
}
