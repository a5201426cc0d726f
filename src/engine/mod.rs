//! Chat engine: ties the session store, the dispatcher and the reconciler together.
//!
//! ```text
//! draft ──submit──▶ user message appended ──▶ Dispatcher ──▶ DriverReply
//!                                                              │
//!                         Reconciler ◀── text or events ───────┘
//!                             │
//!                             ▼
//!                       SessionStore (persisted on every write)
//! ```
//!
//! The store lock is only taken for short synchronous sections and never held
//! across an `.await`, so sessions can stream concurrently.

pub mod reconciler;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::backend::{Dispatcher, DriverReply};
use crate::error::{BackendError, SubmitError};
use crate::models::{ChatMode, ChatRequest, Message, Origin, SessionSummary};
use crate::store::SessionStore;

pub use reconciler::{Reconciler, INTERRUPTED_NOTICE};

/// Progress notifications for a front end
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    /// The user's message was appended
    User { session_id: String, index: usize },
    /// The assistant message at `index` now reads `content`
    Assistant {
        session_id: String,
        index: usize,
        content: String,
        origin: Origin,
    },
    /// The action is over and the session accepts input again
    Finished(SubmitOutcome),
}

/// Result of one accepted submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub session_id: String,
    pub mode: ChatMode,
    /// Index of the user message
    pub user_index: usize,
    /// Index of the assistant message written for this action
    pub assistant_index: Option<usize>,
    /// Final origin tag of the assistant message
    pub origin: Origin,
    /// Failure reported in the transcript, if any
    pub error: Option<BackendError>,
}

impl SubmitOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a session busy for as long as it lives.
struct BusyGuard<'a> {
    busy: &'a Mutex<HashSet<String>>,
    session_id: String,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a Mutex<HashSet<String>>, session_id: &str) -> Option<Self> {
        if !lock(busy).insert(session_id.to_string()) {
            return None;
        }
        Some(Self {
            busy,
            session_id: session_id.to_string(),
        })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        lock(self.busy).remove(&self.session_id);
    }
}

/// Multi-session chat client.
pub struct ChatEngine {
    store: Arc<Mutex<SessionStore>>,
    dispatcher: Dispatcher,
    busy: Mutex<HashSet<String>>,
    drafts: Mutex<HashMap<String, String>>,
    updates: Option<UnboundedSender<ChatUpdate>>,
}

impl ChatEngine {
    pub fn new(store: SessionStore, dispatcher: Dispatcher) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            dispatcher,
            busy: Mutex::new(HashSet::new()),
            drafts: Mutex::new(HashMap::new()),
            updates: None,
        }
    }

    /// Publish [`ChatUpdate`]s on `tx`.
    pub fn with_updates(mut self, tx: UnboundedSender<ChatUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<Mutex<SessionStore>> {
        self.store.clone()
    }

    /// Run `f` with the store locked. `f` must not block.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut SessionStore) -> R) -> R {
        f(&mut *lock(&self.store))
    }

    pub fn current_session_id(&self) -> String {
        self.with_store(|store| store.current_session_id().to_string())
    }

    pub fn create_session(&self) -> String {
        self.with_store(SessionStore::create_session)
    }

    pub fn switch_session(&self, session_id: &str) {
        self.with_store(|store| store.switch_session(session_id));
    }

    /// Delete a session. A session with an action in flight is kept.
    pub fn delete_session(&self, session_id: &str) -> bool {
        // Held until the store has dropped the session so no submit can start in between.
        let busy = lock(&self.busy);
        if busy.contains(session_id) {
            warn!("Not deleting busy session {}", session_id);
            return false;
        }
        lock(&self.drafts).remove(session_id);
        let deleted = self.with_store(|store| store.delete_session(session_id));
        drop(busy);
        deleted
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.with_store(|store| store.list_sessions())
    }

    /// Copy of a session's transcript.
    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        self.with_store(|store| store.messages(session_id).to_vec())
    }

    pub fn is_busy(&self, session_id: &str) -> bool {
        lock(&self.busy).contains(session_id)
    }

    pub fn set_draft(&self, session_id: &str, text: impl Into<String>) {
        lock(&self.drafts).insert(session_id.to_string(), text.into());
    }

    pub fn draft(&self, session_id: &str) -> String {
        lock(&self.drafts).get(session_id).cloned().unwrap_or_default()
    }

    /// Put `text` in the session's draft and submit it.
    pub async fn send(
        &self,
        session_id: &str,
        text: impl Into<String>,
        mode: ChatMode,
    ) -> Result<SubmitOutcome, SubmitError> {
        self.set_draft(session_id, text);
        self.submit(session_id, mode).await
    }

    /// Send the session's draft through the backend for `mode`.
    ///
    /// Refused without touching anything when the session is busy or the draft
    /// is blank. Otherwise the user message is appended and the draft cleared
    /// before the request goes out, and exactly one assistant message (reply or
    /// error) is written before this returns.
    pub async fn submit(
        &self,
        session_id: &str,
        mode: ChatMode,
    ) -> Result<SubmitOutcome, SubmitError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy, session_id) else {
            debug!("Rejected submit on busy session {}", session_id);
            return Err(SubmitError::Busy {
                session_id: session_id.to_string(),
            });
        };

        let text = {
            let mut drafts = lock(&self.drafts);
            let has_text = drafts
                .get(session_id)
                .is_some_and(|draft| !draft.trim().is_empty());
            if !has_text {
                return Err(SubmitError::EmptyInput);
            }
            drafts.remove(session_id).unwrap_or_default()
        };

        let message = Message::user(text);
        let (history, user_index) = self.with_store(|store| {
            let history = store.messages(session_id).to_vec();
            let index = store.append_message(session_id, message.clone());
            (history, index)
        });
        self.publish(ChatUpdate::User {
            session_id: session_id.to_string(),
            index: user_index,
        });
        info!("Submitting {} message to session {}", mode, session_id);

        let request = ChatRequest::new(session_id, history, message);
        let mut reconciler = Reconciler::new(&self.store, self.updates.as_ref(), session_id);
        let error = match self.dispatcher.dispatch(mode, request).await {
            Ok(DriverReply::Text(text)) => {
                reconciler.apply_text(text);
                None
            }
            Ok(DriverReply::Events(mut events)) => {
                let mut failure = None;
                while let Some(item) = events.next().await {
                    match item {
                        Ok(event) => reconciler.apply_event(event),
                        Err(e) => {
                            let e = BackendError::from(e);
                            reconciler.interrupt_stream(&e);
                            failure = Some(e);
                            break;
                        }
                    }
                }
                match failure {
                    Some(e) => Some(e),
                    None => reconciler.finish_stream(),
                }
            }
            Err(e) => {
                reconciler.apply_error(&e);
                Some(e)
            }
        };

        let outcome = SubmitOutcome {
            session_id: session_id.to_string(),
            mode,
            user_index,
            assistant_index: reconciler.index(),
            origin: match &error {
                Some(_) if reconciler.delta_count() == 0 => Origin::Error,
                _ if mode == ChatMode::Batch => Origin::Batch,
                _ => reconciler.origin(),
            },
            error,
        };
        drop(reconciler);
        drop(_busy);

        debug!(
            "Finished {} action on session {} ({})",
            mode,
            session_id,
            if outcome.is_ok() { "ok" } else { "failed" }
        );
        self.publish(ChatUpdate::Finished(outcome.clone()));
        Ok(outcome)
    }

    fn publish(&self, update: ChatUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::InMemoryPersistence;
    use crate::backend::BackendDriver;
    use crate::error::HttpError;
    use crate::models::MessageRole;
    use crate::stream::StreamEvent;
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::Notify;

    /// Driver that replies with fixed text or events and records what it was sent.
    struct ScriptedDriver {
        reply: fn() -> Result<DriverReply, BackendError>,
        seen: Mutex<Vec<ChatRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedDriver {
        fn new(reply: fn() -> Result<DriverReply, BackendError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(reply: fn() -> Result<DriverReply, BackendError>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(reply)
            }
        }
    }

    #[async_trait]
    impl BackendDriver for ScriptedDriver {
        async fn send(&self, request: ChatRequest) -> Result<DriverReply, BackendError> {
            self.seen.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (self.reply)()
        }
    }

    fn text_reply() -> Result<DriverReply, BackendError> {
        Ok(DriverReply::Text("pong".to_string()))
    }

    fn event_reply() -> Result<DriverReply, BackendError> {
        let events = vec![
            Ok(StreamEvent::Delta {
                text: "a".to_string(),
                model: Some("monday".to_string()),
            }),
            Ok(StreamEvent::Delta {
                text: "b".to_string(),
                model: None,
            }),
        ];
        Ok(DriverReply::Events(Box::pin(stream::iter(events))))
    }

    fn broken_reply() -> Result<DriverReply, BackendError> {
        Err(BackendError::Transport(HttpError::ConnectionFailed("refused".into())))
    }

    fn engine(
        batch: Arc<ScriptedDriver>,
        live: Arc<ScriptedDriver>,
    ) -> (ChatEngine, String) {
        let store = SessionStore::open(InMemoryPersistence::new());
        let id = store.current_session_id().to_string();
        (ChatEngine::new(store, Dispatcher::new(batch, live)), id)
    }

    #[tokio::test]
    async fn test_batch_submit_appends_user_then_assistant() {
        let batch = Arc::new(ScriptedDriver::new(text_reply));
        let (engine, id) = engine(batch.clone(), Arc::new(ScriptedDriver::new(event_reply)));

        engine.set_draft(&id, "ping");
        let outcome = engine.submit(&id, ChatMode::Batch).await.unwrap();

        assert!(outcome.is_ok());
        assert_eq!(outcome.user_index, 0);
        assert_eq!(outcome.assistant_index, Some(1));
        assert_eq!(engine.draft(&id), "");
        assert!(!engine.is_busy(&id));

        let messages = engine.messages(&id);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "ping");
        assert_eq!(messages[1].content, "pong");
        assert_eq!(messages[1].origin, Origin::Batch);
        assert!(batch.seen.lock().unwrap()[0].history.is_empty());
    }

    #[tokio::test]
    async fn test_live_submit_reconciles_events() {
        let (engine, id) = engine(
            Arc::new(ScriptedDriver::new(text_reply)),
            Arc::new(ScriptedDriver::new(event_reply)),
        );

        let outcome = engine.send(&id, "hi", ChatMode::Live).await.unwrap();
        assert_eq!(outcome.origin, Origin::Live);

        let messages = engine.messages(&id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "a\nb");
        assert_eq!(messages[1].origin, Origin::Live);
    }

    #[tokio::test]
    async fn test_history_is_sent_with_next_message() {
        let batch = Arc::new(ScriptedDriver::new(text_reply));
        let (engine, id) = engine(batch.clone(), Arc::new(ScriptedDriver::new(event_reply)));

        engine.send(&id, "one", ChatMode::Batch).await.unwrap();
        engine.send(&id, "two", ChatMode::Batch).await.unwrap();

        let seen = batch.seen.lock().unwrap();
        let contents: Vec<&str> = seen[1].history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "pong"]);
        assert_eq!(seen[1].message.content, "two");
    }

    #[tokio::test]
    async fn test_blank_draft_is_rejected_without_mutation() {
        let (engine, id) = engine(
            Arc::new(ScriptedDriver::new(text_reply)),
            Arc::new(ScriptedDriver::new(event_reply)),
        );

        let err = engine.send(&id, "   \n", ChatMode::Batch).await.unwrap_err();
        assert_eq!(err, SubmitError::EmptyInput);
        assert!(engine.messages(&id).is_empty());
        assert!(!engine.is_busy(&id));

        assert_eq!(engine.submit(&id, ChatMode::Batch).await, Err(SubmitError::EmptyInput));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_error_message() {
        let (engine, id) = engine(
            Arc::new(ScriptedDriver::new(broken_reply)),
            Arc::new(ScriptedDriver::new(event_reply)),
        );

        let outcome = engine.send(&id, "hello", ChatMode::Batch).await.unwrap();
        assert!(!outcome.is_ok());
        assert_eq!(outcome.origin, Origin::Error);

        let messages = engine.messages(&id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].origin, Origin::Error);
        assert_eq!(messages[1].content, "API error: Connection failed: refused");
        assert!(!engine.is_busy(&id));
    }

    #[tokio::test]
    async fn test_busy_session_rejects_second_submit() {
        let gate = Arc::new(Notify::new());
        let batch = Arc::new(ScriptedDriver::gated(text_reply, gate.clone()));
        let (engine, id) = engine(batch, Arc::new(ScriptedDriver::new(event_reply)));

        let first = engine.send(&id, "first", ChatMode::Batch);
        let second = async {
            while !engine.is_busy(&id) {
                tokio::task::yield_now().await;
            }
            let rejected = engine.send(&id, "second", ChatMode::Batch).await;
            // The rejected draft stays put and nothing was appended for it.
            assert_eq!(engine.draft(&id), "second");
            assert_eq!(engine.messages(&id).len(), 1);
            gate.notify_one();
            rejected
        };

        let (first, second) = tokio::join!(first, second);
        assert!(first.unwrap().is_ok());
        assert_eq!(
            second,
            Err(SubmitError::Busy {
                session_id: id.clone()
            })
        );
        assert_eq!(engine.messages(&id).len(), 2);
    }

    #[tokio::test]
    async fn test_updates_follow_the_action() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let (engine, id) = engine(
            Arc::new(ScriptedDriver::new(text_reply)),
            Arc::new(ScriptedDriver::new(event_reply)),
        );
        let engine = engine.with_updates(tx);

        engine.send(&id, "hi", ChatMode::Live).await.unwrap();

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert!(matches!(updates[0], ChatUpdate::User { index: 0, .. }));
        assert!(matches!(updates[1], ChatUpdate::Assistant { index: 1, .. }));
        assert!(matches!(updates[2], ChatUpdate::Assistant { ref content, .. } if content == "a\nb"));
        assert!(matches!(updates.last(), Some(ChatUpdate::Finished(_))));
    }

    #[tokio::test]
    async fn test_delete_refuses_busy_session() {
        let (engine, id) = engine(
            Arc::new(ScriptedDriver::new(text_reply)),
            Arc::new(ScriptedDriver::new(event_reply)),
        );
        let guard = BusyGuard::acquire(&engine.busy, &id).unwrap();
        assert!(!engine.delete_session(&id));
        drop(guard);
        assert!(engine.delete_session(&id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_racing_submit_never_resurrects_session() {
        for _ in 0..200 {
            let (engine, id) = engine(
                Arc::new(ScriptedDriver::new(text_reply)),
                Arc::new(ScriptedDriver::new(event_reply)),
            );
            let engine = Arc::new(engine);
            engine.set_draft(&id, "ping");

            let submitter = {
                let engine = engine.clone();
                let id = id.clone();
                tokio::spawn(async move { engine.submit(&id, ChatMode::Batch).await })
            };
            let deleted = engine.delete_session(&id);
            let submitted = submitter.await.unwrap();

            if deleted {
                assert!(
                    engine.messages(&id).is_empty(),
                    "deleted session came back: {:?} ({:?})",
                    engine.messages(&id),
                    submitted.map(|o| o.assistant_index)
                );
            } else {
                assert_eq!(engine.messages(&id).len(), 2);
            }
        }
    }
}
