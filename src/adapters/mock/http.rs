//! Mock HTTP client for testing.
//!
//! Responses are configured per URL (exact match first, then prefix match,
//! then a default) and every request is recorded for later assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::error::HttpError;
use crate::traits::{ByteStream, HttpClient, HttpResponse};

/// A recorded HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Body parsed as JSON, `Value::Null` when absent or invalid.
    pub fn json(&self) -> serde_json::Value {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Configured reply for a URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Buffered response (any status)
    Success(HttpResponse),
    /// Fail before a response exists
    Error(HttpError),
    /// Stream these chunks in order
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail
    StreamThenError(Vec<Bytes>, HttpError),
}

impl MockResponse {
    /// JSON body with status 200
    pub fn json(body: serde_json::Value) -> Self {
        MockResponse::Success(HttpResponse::new(200, body.to_string()))
    }

    /// Chunks taken from string slices
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            chunks
                .into_iter()
                .map(|c| Bytes::from(c.into()))
                .collect(),
        )
    }
}

/// Mock HTTP client.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response for a URL (or URL prefix).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Response for URLs without a configured match.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &str, url: &str, body: Option<&str>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            body: body.map(str::to_string),
        });
    }

    fn response_for(&self, url: &str) -> Result<MockResponse, HttpError> {
        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(url) {
            return Ok(response.clone());
        }
        if let Some((_, response)) = responses.iter().find(|(prefix, _)| url.starts_with(*prefix)) {
            return Ok(response.clone());
        }
        self.default_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HttpError::Other(format!("No mock response for URL: {}", url)))
    }

    fn buffered(&self, url: &str) -> Result<HttpResponse, HttpError> {
        match self.response_for(url)? {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
            MockResponse::Stream(chunks) => Ok(HttpResponse::new(200, chunks.concat())),
            MockResponse::StreamThenError(_, err) => Err(err),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.record("GET", url, None);
        self.buffered(url)
    }

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        self.record("POST", url, Some(body));
        self.buffered(url)
    }

    async fn post_json_stream(&self, url: &str, body: &str) -> Result<ByteStream, HttpError> {
        self.record("POST", url, Some(body));
        match self.response_for(url)? {
            MockResponse::Stream(chunks) => Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)))),
            MockResponse::StreamThenError(chunks, err) => {
                let items = chunks.into_iter().map(Ok).chain(std::iter::once(Err(err)));
                Ok(Box::pin(stream::iter(items)))
            }
            MockResponse::Success(response) => {
                let response = response.error_for_status()?;
                Ok(Box::pin(stream::iter(std::iter::once(Ok(response.body)))))
            }
            MockResponse::Error(err) => Err(err),
        }
    }
}
