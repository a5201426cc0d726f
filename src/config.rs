//! Client configuration.
//!
//! Defaults, then environment variables, then CLI flags (applied by the caller
//! through the `with_*` builders).

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::models::ChatMode;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8088";
pub const DEFAULT_LIVE_MODEL: &str = "monday";
pub const DEFAULT_BATCH_MODEL: &str = "mistral";

/// Path of the one-shot endpoint, relative to the base URL
pub const BATCH_PATH: &str = "/completions/batch";
/// Path of the streaming endpoint, relative to the base URL
pub const LIVE_PATH: &str = "/completions/live";

pub const ENV_BASE_URL: &str = "DUET_BASE_URL";
pub const ENV_LIVE_MODEL: &str = "DUET_LIVE_MODEL";
pub const ENV_BATCH_MODEL: &str = "DUET_BATCH_MODEL";
pub const ENV_MODE: &str = "DUET_MODE";
pub const ENV_DATA_DIR: &str = "DUET_DATA_DIR";

/// Configuration for the chat client.
///
/// # Example
///
/// ```
/// use duet::config::ClientConfig;
/// use duet::models::ChatMode;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://127.0.0.1:9000/")
///     .with_mode(ChatMode::Live);
/// assert_eq!(config.live_url(), "http://127.0.0.1:9000/completions/live");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server root, without trailing slash
    pub base_url: String,
    /// Model name sent to the streaming endpoint
    pub live_model: String,
    /// Model name sent to the one-shot endpoint
    pub batch_model: String,
    /// Mode used when the user does not pick one
    pub default_mode: ChatMode,
    /// Where sessions are persisted
    pub data_dir: PathBuf,
    /// TCP connect timeout; reads are unbounded because live replies are slow
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            batch_model: DEFAULT_BATCH_MODEL.to_string(),
            default_mode: ChatMode::default(),
            data_dir: default_data_dir(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// `<platform data dir>/duet`, or `./.duet` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("duet"))
        .unwrap_or_else(|| PathBuf::from(".duet"))
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `DUET_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `DUET_*` key.
    ///
    /// Empty values are ignored; an unrecognised mode is logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_BASE_URL) {
            config = config.with_base_url(url);
        }
        if let Some(model) = get(ENV_LIVE_MODEL) {
            config.live_model = model;
        }
        if let Some(model) = get(ENV_BATCH_MODEL) {
            config.batch_model = model;
        }
        if let Some(mode) = get(ENV_MODE) {
            match mode.parse() {
                Ok(mode) => config.default_mode = mode,
                Err(e) => warn!("Ignoring {}: {}", ENV_MODE, e),
            }
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    /// Set the server root. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_live_model(mut self, model: impl Into<String>) -> Self {
        self.live_model = model.into();
        self
    }

    pub fn with_batch_model(mut self, model: impl Into<String>) -> Self {
        self.batch_model = model.into();
        self
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn batch_url(&self) -> String {
        format!("{}{}", self.base_url, BATCH_PATH)
    }

    pub fn live_url(&self) -> String {
        format!("{}{}", self.base_url, LIVE_PATH)
    }

    /// Root URL probed by the health check
    pub fn health_url(&self) -> String {
        format!("{}/", self.base_url)
    }
}
