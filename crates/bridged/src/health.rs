//! Structured health reporting for bridge lifecycle events.

use std::sync::Arc;

use bridge_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::dispatch::TelemetrySnapshot;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the connection manager accepts clients.
    fn listener_started(&self, endpoint: &SocketEndpoint);

    /// Invoked after the subsystem has shut down.
    fn subsystem_stopped(&self, snapshot: &TelemetrySnapshot);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        (**self).listener_started(endpoint);
    }

    fn subsystem_stopped(&self, snapshot: &TelemetrySnapshot) {
        (**self).subsystem_stopped(snapshot);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            drain_interval_ms = config.drain_interval_ms,
            deferred_queue_limit = config.deferred_queue_limit,
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_started",
            socket = %endpoint,
            "accepting automation clients"
        );
    }

    fn subsystem_stopped(&self, snapshot: &TelemetrySnapshot) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "subsystem_stopped",
            total = snapshot.total,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            dropped = snapshot.dropped,
            "automation subsystem stopped"
        );
    }
}
