//! Rejections returned by [`crate::engine::ChatEngine::submit`].

use thiserror::Error;

/// Why a submission was refused. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The session already has an action in flight
    #[error("Session {session_id} is busy; wait for the current response to complete")]
    Busy { session_id: String },

    /// The draft was empty or whitespace only
    #[error("Nothing to send")]
    EmptyInput,
}
