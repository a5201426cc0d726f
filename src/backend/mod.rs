//! Backend drivers and the dispatcher that picks one per user action.
//!
//! Both drivers sit behind [`BackendDriver`]; the engine only sees a
//! [`DriverReply`], either the whole reply text or a stream of events.

pub mod batch;
pub mod live;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{BackendError, HttpError};
use crate::models::{ChatMode, ChatRequest};
use crate::stream::EventStream;
use crate::traits::HttpClient;

pub use batch::{parse_batch_response, BatchDriver, UNKNOWN_FORMAT_MESSAGE};
pub use live::StreamingDriver;

/// What a driver hands back for one request
pub enum DriverReply {
    /// Complete reply text from a one-shot backend
    Text(String),
    /// Incremental events from a streaming backend
    Events(EventStream),
}

impl fmt::Debug for DriverReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverReply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DriverReply::Events(_) => f.write_str("Events(..)"),
        }
    }
}

/// One backend protocol.
#[async_trait]
pub trait BackendDriver: Send + Sync {
    /// Send the history plus the new message and return the reply.
    async fn send(&self, request: ChatRequest) -> Result<DriverReply, BackendError>;
}

/// Routes a user action to the driver for its mode.
#[derive(Clone)]
pub struct Dispatcher {
    batch: Arc<dyn BackendDriver>,
    live: Arc<dyn BackendDriver>,
    http: Option<Arc<dyn HttpClient>>,
    health_url: Option<String>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("health_url", &self.health_url)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher over arbitrary drivers. It has no health endpoint.
    pub fn new(batch: Arc<dyn BackendDriver>, live: Arc<dyn BackendDriver>) -> Self {
        Self {
            batch,
            live,
            http: None,
            health_url: None,
        }
    }

    /// HTTP drivers for the endpoints and models in `config`.
    pub fn from_config(config: &ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        let batch = BatchDriver::new(http.clone(), config.batch_url(), &config.batch_model);
        let live = StreamingDriver::new(http.clone(), config.live_url(), &config.live_model);
        debug!(
            "Dispatcher ready: batch={} ({}), live={} ({})",
            config.batch_url(),
            config.batch_model,
            config.live_url(),
            config.live_model
        );
        Self {
            batch: Arc::new(batch),
            live: Arc::new(live),
            http: Some(http),
            health_url: Some(config.health_url()),
        }
    }

    pub fn driver(&self, mode: ChatMode) -> Arc<dyn BackendDriver> {
        match mode {
            ChatMode::Live => self.live.clone(),
            ChatMode::Batch => self.batch.clone(),
        }
    }

    /// Send `request` through the driver for `mode`.
    pub async fn dispatch(
        &self,
        mode: ChatMode,
        request: ChatRequest,
    ) -> Result<DriverReply, BackendError> {
        debug!("Dispatching {} request for session {}", mode, request.session_id);
        self.driver(mode).send(request).await
    }

    /// Probe the server root.
    ///
    /// `Ok(true)` on a 2xx answer, `Ok(false)` on any other status, `Err` when
    /// the server could not be reached.
    pub async fn health_check(&self) -> Result<bool, HttpError> {
        let (Some(http), Some(url)) = (&self.http, &self.health_url) else {
            return Err(HttpError::Other("no health endpoint configured".to_string()));
        };
        let response = http.get(url).await?;
        if !response.is_success() {
            warn!("Health check {} returned {}", url, response.status);
        }
        Ok(response.is_success())
    }
}
