//! Message mutation methods for SessionStore

use tracing::{debug, warn};

use crate::models::{Message, Origin};

use super::SessionStore;

impl SessionStore {
    /// Append `message` to a session, creating the session if needed.
    ///
    /// Returns the index the message landed at.
    pub fn append_message(&mut self, session_id: &str, message: Message) -> usize {
        let session = self.ensure_session(session_id);
        session.messages.push(message);
        let index = session.messages.len() - 1;
        debug!("Appended message {} to session {}", index, session_id);
        self.persist();
        index
    }

    /// Overwrite the last assistant message of a session, or append a new one
    /// if the session has none. Returns the index of the message written.
    ///
    /// Used while a streamed reply grows: each delta replaces the previous
    /// content in place so the transcript never shows partial duplicates.
    pub fn update_last_assistant_message(
        &mut self,
        session_id: &str,
        content: impl Into<String>,
        origin: Origin,
    ) -> usize {
        let content = content.into();
        let session = self.ensure_session(session_id);
        let index = match session.last_assistant_index() {
            Some(index) => {
                let message = &mut session.messages[index];
                message.content = content;
                message.origin = origin;
                index
            }
            None => {
                session.messages.push(Message::assistant(content, origin));
                session.messages.len() - 1
            }
        };
        self.persist();
        index
    }

    /// Overwrite the message at `index`, which must be an assistant message.
    ///
    /// Returns `false` without touching anything when the session or index no
    /// longer exist, or the slot holds a user message.
    pub fn replace_message(
        &mut self,
        session_id: &str,
        index: usize,
        content: impl Into<String>,
        origin: Origin,
    ) -> bool {
        let Some(message) = self
            .sessions
            .get_mut(session_id)
            .and_then(|s| s.messages.get_mut(index))
        else {
            warn!("No message {} in session {}", index, session_id);
            return false;
        };
        if !message.is_assistant() {
            warn!("Refusing to overwrite user message {} in {}", index, session_id);
            return false;
        }
        message.content = content.into();
        message.origin = origin;
        self.persist();
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::mock::InMemoryPersistence;
    use crate::models::{Message, MessageRole, Origin};
    use crate::store::SessionStore;

    fn store() -> (SessionStore, InMemoryPersistence, String) {
        let persistence = InMemoryPersistence::new();
        let store = SessionStore::open(persistence.clone());
        let id = store.current_session_id().to_string();
        (store, persistence, id)
    }

    #[test]
    fn test_append_returns_index_and_persists() {
        let (mut store, persistence, id) = store();
        assert_eq!(store.append_message(&id, Message::user("one")), 0);
        assert_eq!(store.append_message(&id, Message::user("two")), 1);

        let saved = persistence.snapshot().unwrap();
        assert_eq!(saved.sessions[&id].messages.len(), 2);
        assert_eq!(saved.sessions[&id].messages[1].content, "two");
    }

    #[test]
    fn test_append_to_missing_session_creates_it() {
        let (mut store, _, _) = store();
        store.append_message("ghost", Message::user("boo"));

        assert!(store.contains("ghost"));
        assert_eq!(store.messages("ghost").len(), 1);
    }

    #[test]
    fn test_cumulative_updates_leave_one_assistant_message() {
        let (mut store, _, id) = store();
        store.append_message(&id, Message::user("question"));

        let mut accumulated = Vec::new();
        for delta in ["a", "b", "c"] {
            accumulated.push(delta);
            store.update_last_assistant_message(&id, accumulated.join("\n"), Origin::Stream);
        }

        let messages = store.messages(&id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "a\nb\nc");
        assert_eq!(messages[1].origin, Origin::Stream);
    }

    #[test]
    fn test_update_keeps_position_when_user_message_follows() {
        let (mut store, _, id) = store();
        store.append_message(&id, Message::user("q1"));
        let index = store.update_last_assistant_message(&id, "partial", Origin::Stream);
        store.append_message(&id, Message::user("q2"));

        let updated = store.update_last_assistant_message(&id, "complete", Origin::Live);
        assert_eq!(updated, index);

        let messages = store.messages(&id);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "complete");
        assert_eq!(messages[1].origin, Origin::Live);
        assert_eq!(messages[2].content, "q2");
    }

    #[test]
    fn test_replace_message_by_index() {
        let (mut store, persistence, id) = store();
        store.append_message(&id, Message::user("q"));
        let index = store.append_message(&id, Message::assistant("draft", Origin::Stream));

        assert!(store.replace_message(&id, index, "final", Origin::Live));
        assert_eq!(store.messages(&id)[index].content, "final");
        assert_eq!(
            persistence.snapshot().unwrap().sessions[&id].messages[index].content,
            "final"
        );
    }

    #[test]
    fn test_replace_message_rejects_bad_targets() {
        let (mut store, persistence, id) = store();
        store.append_message(&id, Message::user("q"));
        let saves = persistence.save_count();

        assert!(!store.replace_message(&id, 0, "nope", Origin::Batch));
        assert!(!store.replace_message(&id, 7, "nope", Origin::Batch));
        assert!(!store.replace_message("missing", 0, "nope", Origin::Batch));
        assert_eq!(store.messages(&id)[0].content, "q");
        assert_eq!(persistence.save_count(), saves);
        assert!(!store.contains("missing"));
    }
}
