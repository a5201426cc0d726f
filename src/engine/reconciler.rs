//! Applies backend results to a session's transcript.
//!
//! One reconciler lives for one user action. It owns the in-flight assistant
//! message: created on the first delta, then rewritten in place through the
//! index it recorded, so exactly one assistant message results per action.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::{BackendError, NO_RESPONSE_MESSAGE};
use crate::models::{Message, Origin};
use crate::store::SessionStore;
use crate::stream::StreamEvent;

use super::{lock, ChatUpdate};

/// Text appended to a partial reply when its stream broke
pub const INTERRUPTED_NOTICE: &str = "[response interrupted]";

pub struct Reconciler<'a> {
    store: &'a Mutex<SessionStore>,
    updates: Option<&'a UnboundedSender<ChatUpdate>>,
    session_id: String,
    deltas: Vec<String>,
    index: Option<usize>,
    origin: Origin,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a Mutex<SessionStore>,
        updates: Option<&'a UnboundedSender<ChatUpdate>>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            updates,
            session_id: session_id.into(),
            deltas: Vec::new(),
            index: None,
            origin: Origin::Stream,
        }
    }

    /// Index of the assistant message written so far
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Deltas so far joined by newlines, trimmed.
    pub fn accumulated(&self) -> String {
        self.deltas.join("\n").trim().to_string()
    }

    /// Apply one stream event.
    pub fn apply_event(&mut self, event: StreamEvent) {
        let promoted = event.is_live() && self.origin != Origin::Live;
        if promoted {
            self.origin = Origin::Live;
        }

        match event {
            StreamEvent::Delta { text, .. } => {
                self.deltas.push(text);
                let content = self.accumulated();
                self.write(content, self.origin);
            }
            StreamEvent::Metadata { model } => {
                debug!("Stream for {} identified model {}", self.session_id, model);
                if promoted && self.index.is_some() {
                    let content = self.accumulated();
                    self.write(content, self.origin);
                }
            }
        }
    }

    /// The stream ended cleanly. With no deltas at all, report that nothing came back.
    pub fn finish_stream(&mut self) -> Option<BackendError> {
        if self.index.is_some() {
            return None;
        }
        warn!("Live stream for {} ended without any delta", self.session_id);
        self.write(NO_RESPONSE_MESSAGE.to_string(), Origin::Error);
        Some(BackendError::Protocol(NO_RESPONSE_MESSAGE.to_string()))
    }

    /// The stream broke. Partial text is kept with a notice appended; with no
    /// text yet, the error itself becomes the reply.
    pub fn interrupt_stream(&mut self, error: &BackendError) {
        warn!("Live stream for {} failed: {}", self.session_id, error);
        if self.index.is_some() {
            let content = format!(
                "{}\n\n{} {}",
                self.accumulated(),
                INTERRUPTED_NOTICE,
                error.bubble_text()
            );
            self.write(content, self.origin);
        } else {
            self.write(error.bubble_text(), Origin::Error);
        }
    }

    /// A one-shot reply arrived.
    pub fn apply_text(&mut self, text: String) {
        self.write(text, Origin::Batch);
    }

    /// The request failed before any reply.
    pub fn apply_error(&mut self, error: &BackendError) {
        warn!("Request for {} failed: {}", self.session_id, error);
        self.write(error.bubble_text(), Origin::Error);
    }

    fn write(&mut self, content: String, origin: Origin) {
        let index = {
            let mut store = lock(self.store);
            match self.index {
                Some(index)
                    if store.replace_message(&self.session_id, index, content.clone(), origin) =>
                {
                    index
                }
                Some(_) => {
                    store.update_last_assistant_message(&self.session_id, content.clone(), origin)
                }
                None => store.append_message(
                    &self.session_id,
                    Message::assistant(content.clone(), origin),
                ),
            }
        };
        self.index = Some(index);

        if let Some(tx) = self.updates {
            let _ = tx.send(ChatUpdate::Assistant {
                session_id: self.session_id.clone(),
                index,
                content,
                origin,
            });
        }
    }
}
