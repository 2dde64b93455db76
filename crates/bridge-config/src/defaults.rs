use std::time::Duration;

use crate::socket::SocketEndpoint;

/// Host the bridge listens on when no socket is configured.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Port the bridge listens on when no socket is configured.
pub const DEFAULT_TCP_PORT: u16 = 8091;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Interval between drain task ticks, in milliseconds.
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 100;

/// Lower bound applied to the drain interval.
pub const MIN_DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum number of deferred requests held while the engine is busy.
pub const DEFAULT_DEFERRED_QUEUE_LIMIT: usize = 4096;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the default socket endpoint for the bridge.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
}

/// Default drain interval in milliseconds (ten ticks per second).
#[must_use]
pub const fn default_drain_interval_ms() -> u64 {
    DEFAULT_DRAIN_INTERVAL_MS
}

/// Default deferred queue capacity.
#[must_use]
pub const fn default_deferred_queue_limit() -> usize {
    DEFAULT_DEFERRED_QUEUE_LIMIT
}
