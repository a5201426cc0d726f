//! Common test utilities for integration tests.
//!
//! Builds engines over mock or real HTTP clients and in-memory or file
//! persistence, so each test only states what differs.

#![allow(dead_code)]

use std::sync::Arc;

use duet::adapters::mock::{InMemoryPersistence, MockHttpClient, MockResponse};
use duet::backend::Dispatcher;
use duet::config::ClientConfig;
use duet::engine::ChatEngine;
use duet::store::SessionStore;
use duet::traits::HttpClient;

pub const BASE_URL: &str = "http://backend.test";

pub fn batch_url() -> String {
    format!("{}/completions/batch", BASE_URL)
}

pub fn live_url() -> String {
    format!("{}/completions/live", BASE_URL)
}

/// Config pointing at `base_url` with the default models.
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig::default().with_base_url(base_url)
}

/// Engine, its persistence and the id of its current session.
pub struct TestEngine {
    pub engine: Arc<ChatEngine>,
    pub persistence: InMemoryPersistence,
    pub session_id: String,
}

/// Engine over any HTTP client, backed by in-memory persistence.
pub fn engine_with_http(http: Arc<dyn HttpClient>, base_url: &str) -> TestEngine {
    let persistence = InMemoryPersistence::new();
    let store = SessionStore::open(persistence.clone());
    let session_id = store.current_session_id().to_string();
    let dispatcher = Dispatcher::from_config(&test_config(base_url), http);
    TestEngine {
        engine: Arc::new(ChatEngine::new(store, dispatcher)),
        persistence,
        session_id,
    }
}

/// Engine over a mock HTTP client. Returns the client for configuring replies.
pub fn mock_engine() -> (TestEngine, Arc<MockHttpClient>) {
    let http = Arc::new(MockHttpClient::new());
    (engine_with_http(http.clone(), BASE_URL), http)
}

/// Stream chunks as the live endpoint would send them, one line per chunk.
pub fn live_lines(lines: &[&str]) -> MockResponse {
    MockResponse::chunks(lines.iter().map(|line| format!("{}\n", line)))
}
