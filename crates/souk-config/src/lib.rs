//! Core configuration and utilities for the Souk marketplace client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    ClientConfig, DEFAULT_API_BASE_URL, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RECONNECT_ATTEMPTS,
    DEFAULT_REALTIME_URL, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_UNREAD_POLL_INTERVAL_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
