//! Streaming driver: one JSON request, a newline-delimited JSON response.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::BackendError;
use crate::models::{ChatRequest, LiveRequest};
use crate::stream::event_stream;
use crate::traits::HttpClient;

use super::{BackendDriver, DriverReply};

/// Driver for `POST /completions/live`.
pub struct StreamingDriver {
    http: Arc<dyn HttpClient>,
    url: String,
    model: String,
}

impl StreamingDriver {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl BackendDriver for StreamingDriver {
    async fn send(&self, request: ChatRequest) -> Result<DriverReply, BackendError> {
        let body = serde_json::to_string(&LiveRequest {
            model: self.model.clone(),
            session_id: request.session_id.clone(),
            messages: request.wire_messages(),
        })?;

        debug!("Opening live stream for session {}", request.session_id);
        let bytes = self.http.post_json_stream(&self.url, &body).await?;
        Ok(DriverReply::Events(event_stream(bytes)))
    }
}
