//! Reqwest-based implementation of [`HttpClient`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::error::HttpError;
use crate::traits::{ByteStream, HttpClient, HttpResponse};

/// HTTP client backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Client with reqwest defaults (no overall timeout, streams may run long).
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Client that gives up connecting after `connect_timeout`.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(Self::convert_error)?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_body() || err.is_decode() {
            HttpError::Io(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    async fn send_json(&self, url: &str, body: &str) -> Result<reqwest::Response, HttpError> {
        self.client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(Self::convert_error)
    }

    async fn buffer(response: reqwest::Response) -> Result<HttpResponse, HttpError> {
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(Self::convert_error)?;
        Ok(HttpResponse::new(status, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::convert_error)?;
        Self::buffer(response).await
    }

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError> {
        let response = self.send_json(url, body).await?;
        Self::buffer(response).await
    }

    async fn post_json_stream(&self, url: &str, body: &str) -> Result<ByteStream, HttpError> {
        let response = self.send_json(url, body).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::Status { status, message });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Self::convert_error));
        Ok(Box::pin(stream))
    }
}
