//! Error types for duet.
//!
//! Errors are split by the boundary they come from:
//!
//! | Type           | Raised by                           | Surfaced as                     |
//! |----------------|-------------------------------------|---------------------------------|
//! | `HttpError`    | the HTTP port                       | wrapped in `BackendError`       |
//! | `BackendError` | batch and streaming drivers         | an `error` assistant message    |
//! | `StorageError` | the persistence port                | a log line, store marked dirty  |
//! | `SubmitError`  | the engine, before any mutation     | returned to the caller          |
//!
//! Malformed stream lines are not errors at all: the parser drops them.

mod backend;
mod storage;
mod submit;

pub use backend::{BackendError, HttpError};
pub use storage::StorageError;
pub use submit::SubmitError;

/// Prefix used for every error bubble shown in a conversation.
pub const ERROR_MESSAGE_PREFIX: &str = "API error: ";

/// Text shown when a streaming reply finished without a single delta.
pub const NO_RESPONSE_MESSAGE: &str = "No response received from the live backend.";
