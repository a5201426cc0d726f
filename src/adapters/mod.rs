//! Concrete implementations of the traits in `crate::traits`.
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`FilePersistence`] - JSON files in the data directory
//!
//! The [`mock`] submodule provides test doubles for both.

pub mod file_persistence;
pub mod mock;
pub mod reqwest_http;

pub use file_persistence::FilePersistence;
pub use mock::{InMemoryPersistence, MockHttpClient};
pub use reqwest_http::ReqwestHttpClient;
