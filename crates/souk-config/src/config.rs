//! Configuration for the marketplace client.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default API base URL (can be overridden at compile time via SOUK_API_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("SOUK_API_URL") {
    Some(url) => url,
    None => "https://api.souk.app",
};

/// Default realtime WebSocket URL (can be overridden at compile time via SOUK_REALTIME_URL env var).
pub const DEFAULT_REALTIME_URL: &str = match option_env!("SOUK_REALTIME_URL") {
    Some(url) => url,
    None => "wss://api.souk.app/ws",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default fixed delay between realtime reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;

/// Default maximum number of consecutive realtime reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default interval for the unread-count poller.
pub const DEFAULT_UNREAD_POLL_INTERVAL_SECS: u64 = 30;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Realtime WebSocket base URL.
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,
    /// Fixed delay between reconnect attempts in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Maximum consecutive reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Unread-count polling interval in seconds.
    #[serde(default = "default_unread_poll_interval_secs")]
    pub unread_poll_interval_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_realtime_url() -> String {
    DEFAULT_REALTIME_URL.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_unread_poll_interval_secs() -> u64 {
    DEFAULT_UNREAD_POLL_INTERVAL_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            unread_poll_interval_secs: DEFAULT_UNREAD_POLL_INTERVAL_SECS,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `SOUK_API_URL`, `SOUK_REALTIME_URL`, `SOUK_LOG_LEVEL`,
    /// `SOUK_RECONNECT_DELAY_MS`, `SOUK_MAX_RECONNECT_ATTEMPTS`,
    /// `SOUK_UNREAD_POLL_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SOUK_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        if let Ok(url) = std::env::var("SOUK_REALTIME_URL") {
            if !url.is_empty() {
                config.realtime_url = url;
            }
        }
        if let Ok(level) = std::env::var("SOUK_LOG_LEVEL") {
            if !level.is_empty() {
                config.log_level = level;
            }
        }
        if let Ok(delay) = std::env::var("SOUK_RECONNECT_DELAY_MS") {
            if let Ok(delay) = delay.parse() {
                config.reconnect_delay_ms = delay;
            }
        }
        if let Ok(max) = std::env::var("SOUK_MAX_RECONNECT_ATTEMPTS") {
            if let Ok(max) = max.parse() {
                config.max_reconnect_attempts = max;
            }
        }
        if let Ok(interval) = std::env::var("SOUK_UNREAD_POLL_INTERVAL_SECS") {
            if let Ok(interval) = interval.parse() {
                config.unread_poll_interval_secs = interval;
            }
        }

        config
    }

    /// Validate that the configured URLs parse and use the expected schemes.
    pub fn validate(&self) -> CoreResult<()> {
        let api = Url::parse(&self.api_base_url)?;
        if api.scheme() != "http" && api.scheme() != "https" {
            return Err(CoreError::Config(format!(
                "api_base_url must be http(s), got {}",
                api.scheme()
            )));
        }

        let realtime = Url::parse(&self.realtime_url)?;
        if realtime.scheme() != "ws" && realtime.scheme() != "wss" {
            return Err(CoreError::Config(format!(
                "realtime_url must be ws(s), got {}",
                realtime.scheme()
            )));
        }

        Ok(())
    }
}
