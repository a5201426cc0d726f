//! duet - a multi-session chat client for a streaming and a one-shot backend
//!
//! This library exposes modules for use by the binary and integration tests.

pub mod adapters;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod stream;
pub mod traits;
