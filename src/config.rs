//! Client configuration.
//!
//! All orchestrator behaviour is controlled through [`ClientConfig`], built
//! via its [`ClientConfigBuilder`]. The defaults reproduce the timings the
//! web front end used: a 300 ms progress tick of +10 capped at 90, and a
//! one-second "Analysis complete" hold before the bar resets.

use crate::error::NoCapError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BACKEND_ENV: &str = "NOCAP_BACKEND";

/// Backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration for an [`crate::Orchestrator`] and its dispatcher.
///
/// # Example
/// ```rust
/// use nocap::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com")
///     .tick_interval_ms(100)
///     .build()
///     .unwrap();
/// assert_eq!(config.endpoint("/mode/text"), "https://api.example.com/mode/text");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the inference service, without a trailing slash.
    pub base_url: String,

    /// Interval between simulated progress ticks. Default: 300.
    pub tick_interval_ms: u64,

    /// Percentage added on every tick. Default: 10.
    pub progress_step: u8,

    /// Ceiling for simulated progress while the call is in flight. Default: 90.
    ///
    /// Only the dispatcher settling successfully moves progress past this.
    pub progress_cap: u8,

    /// How long 100 % stays visible after a success before resetting. Default: 1000.
    pub success_display_ms: u64,

    /// Optional whole-request timeout. Default: none.
    ///
    /// The service has no documented latency bound, so a hung call is
    /// allowed to wait indefinitely unless the caller opts in.
    pub request_timeout_secs: Option<u64>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tick_interval_ms: 300,
            progress_step: 10,
            progress_cap: 90,
            success_display_ms: 1000,
            request_timeout_secs: None,
            user_agent: concat!("nocap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults with `base_url` taken from `NOCAP_BACKEND` when set.
    pub fn from_env() -> Result<Self, NoCapError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(BACKEND_ENV) {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    /// Absolute URL for an endpoint path such as `/mode/text`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms.max(1);
        self
    }

    pub fn progress_step(mut self, step: u8) -> Self {
        self.config.progress_step = step;
        self
    }

    pub fn progress_cap(mut self, cap: u8) -> Self {
        self.config.progress_cap = cap.min(100);
        self
    }

    pub fn success_display_ms(mut self, ms: u64) -> Self {
        self.config.success_display_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, NoCapError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(NoCapError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.progress_step == 0 {
            return Err(NoCapError::InvalidConfig(
                "progress step must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(NoCapError::InvalidConfig(
                "request timeout must be ≥ 1s when set".into(),
            ));
        }
        Ok(self.config)
    }
}
