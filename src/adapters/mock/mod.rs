//! Test doubles for the trait abstractions.
//!
//! - [`MockHttpClient`] - configurable HTTP responses and request recording
//! - [`InMemoryPersistence`] - shared in-memory snapshot slot with failure injection

pub mod http;
pub mod persistence;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use persistence::InMemoryPersistence;
