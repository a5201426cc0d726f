//! One-shot driver: a single JSON request, a single JSON response.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::models::{BatchRequest, ChatRequest};
use crate::traits::HttpClient;

use super::{BackendDriver, DriverReply};

/// Message used when the body matches none of the known shapes
pub const UNKNOWN_FORMAT_MESSAGE: &str = "Unknown API response format.";

/// Driver for `POST /completions/batch`.
pub struct BatchDriver {
    http: Arc<dyn HttpClient>,
    url: String,
    model: String,
}

impl BatchDriver {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl BackendDriver for BatchDriver {
    async fn send(&self, request: ChatRequest) -> Result<DriverReply, BackendError> {
        let body = serde_json::to_string(&BatchRequest {
            model: self.model.clone(),
            messages: request.wire_messages(),
        })?;

        debug!(
            "Sending batch request for session {} ({} messages)",
            request.session_id,
            request.history.len() + 1
        );
        let response = self.http.post_json(&self.url, &body).await?.error_for_status()?;
        let text = parse_batch_response(&response.body)?;
        Ok(DriverReply::Text(text))
    }
}

/// Extract the reply text from a one-shot response body.
///
/// Accepted shapes, in order:
/// - `{"choices": [{"message": {"content": "..."}}]}`
/// - `{"content": "..."}`
/// - `{"error": "...", "detail": "..."}` is reported as a protocol error
///   carrying the detail, else the error; `detail` alone is not an error shape
///
/// Reply text is trimmed. An empty reply counts as an unknown format.
pub fn parse_batch_response(body: &[u8]) -> Result<String, BackendError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Batch response is not JSON: {}", e);
        BackendError::Protocol(UNKNOWN_FORMAT_MESSAGE.to_string())
    })?;

    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .or_else(|| value.get("content").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty());
    if let Some(text) = content {
        return Ok(text.to_string());
    }

    // `detail` only refines a response that carries `error`.
    let failure = value.get("error").and_then(describe).map(|error| {
        value
            .get("detail")
            .and_then(describe)
            .unwrap_or(error)
    });
    match failure {
        Some(detail) => Err(BackendError::Protocol(detail)),
        None => Err(BackendError::Protocol(UNKNOWN_FORMAT_MESSAGE.to_string())),
    }
}

/// Render an error field as text; `null` and empty strings carry nothing.
fn describe(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
