//! Trait abstractions for dependency injection and testability.
//!
//! - [`HttpClient`] - HTTP operations used by the backend drivers
//! - [`SessionPersistence`] - durable storage for the session store

pub mod http;
pub mod persistence;

pub use http::{ByteStream, HttpClient, HttpResponse};
pub use persistence::{
    SessionPersistence, SnapshotRef, StoreSnapshot, CURRENT_SESSION_KEY, SESSIONS_KEY,
};
