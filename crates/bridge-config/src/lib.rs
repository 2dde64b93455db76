//! Shared configuration for the automation bridge.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `BRIDGE_CONFIG_PATH`), then `BRIDGE_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DEFERRED_QUEUE_LIMIT, DEFAULT_DRAIN_INTERVAL_MS, DEFAULT_LOG_FILTER, DEFAULT_TCP_HOST,
    DEFAULT_TCP_PORT, MIN_DRAIN_INTERVAL, default_deferred_queue_limit, default_drain_interval_ms,
    default_log_filter, default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Runtime configuration for the bridge daemon.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "BRIDGE_")]
pub struct Config {
    /// Endpoint the connection manager listens on.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Period of the drain task, in milliseconds.
    #[serde(default = "default_drain_interval_ms")]
    #[ortho_config(default = default_drain_interval_ms())]
    pub drain_interval_ms: u64,
    /// Deferred queue capacity. Zero disables the limit.
    #[serde(default = "default_deferred_queue_limit")]
    #[ortho_config(default = default_deferred_queue_limit())]
    pub deferred_queue_limit: usize,
}

impl Config {
    /// Socket the bridge listens on.
    #[must_use]
    pub const fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Drain tick period, never shorter than [`MIN_DRAIN_INTERVAL`].
    #[must_use]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms).max(MIN_DRAIN_INTERVAL)
    }

    /// Deferred queue capacity, or `None` when unbounded.
    #[must_use]
    pub const fn queue_limit(&self) -> Option<usize> {
        match self.deferred_queue_limit {
            0 => None,
            limit => Some(limit),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            drain_interval_ms: default_drain_interval_ms(),
            deferred_queue_limit: default_deferred_queue_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(1))]
    #[case(4096, Some(4096))]
    fn zero_queue_limit_means_unbounded(#[case] limit: usize, #[case] expected: Option<usize>) {
        let config = Config {
            deferred_queue_limit: limit,
            ..Config::default()
        };
        assert_eq!(config.queue_limit(), expected);
    }

    #[rstest]
    #[case(0, MIN_DRAIN_INTERVAL)]
    #[case(100, Duration::from_millis(100))]
    #[case(250, Duration::from_millis(250))]
    fn drain_interval_is_clamped(#[case] millis: u64, #[case] expected: Duration) {
        let config = Config {
            drain_interval_ms: millis,
            ..Config::default()
        };
        assert_eq!(config.drain_interval(), expected);
    }

    #[test]
    fn defaults_listen_on_loopback() {
        let config = Config::default();
        assert_eq!(config.daemon_socket(), &SocketEndpoint::tcp("127.0.0.1", 8091));
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
    }
}
