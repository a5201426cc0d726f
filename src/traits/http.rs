//! HTTP client port.
//!
//! Both backend drivers talk through this trait so tests can swap in
//! [`crate::adapters::mock::MockHttpClient`] instead of a real network client.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::HttpError;

/// A chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-2xx response into [`HttpError::Status`].
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
                message: self.text_lossy(),
            })
        }
    }
}

/// HTTP operations needed by the drivers.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET and buffer the whole body.
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;

    /// POST a JSON body and buffer the whole response body.
    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, HttpError>;

    /// POST a JSON body and hand back the body as chunks.
    ///
    /// A non-2xx status must be reported as [`HttpError::Status`] without
    /// exposing the body as a stream.
    async fn post_json_stream(&self, url: &str, body: &str) -> Result<ByteStream, HttpError>;
}
