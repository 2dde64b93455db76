//! Outcome telemetry.
//!
//! Every response is reported to a [`TelemetrySink`]. Sinks are called on the
//! request path, so they must return promptly and never fail the request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};

use tracing::debug;

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

/// One response outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Correlation identifier.
    pub request_id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Sanitised response message.
    pub message: String,
    /// Error code; empty on success.
    pub error_code: String,
}

/// Receives response outcomes.
pub trait TelemetrySink: Send + Sync {
    /// Records one outcome. Must not block.
    fn record(&self, outcome: &OutcomeRecord);
}

/// Aggregated counters exposed by [`OutcomeTelemetry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    /// Responses recorded.
    pub total: u64,
    /// Successful responses.
    pub succeeded: u64,
    /// Failed responses.
    pub failed: u64,
    /// Failures grouped by error code.
    pub by_error_code: BTreeMap<String, u64>,
    /// Samples skipped because the counters were busy.
    pub dropped: u64,
}

/// Default sink: logs each outcome and keeps counters.
///
/// Counters are updated with `try_lock`; a contended sample is counted in
/// [`TelemetrySnapshot::dropped`] instead of waiting.
#[derive(Debug, Default)]
pub struct OutcomeTelemetry {
    counters: Mutex<TelemetrySnapshot>,
    dropped: AtomicU64,
}

impl OutcomeTelemetry {
    /// Builds an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counters.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let mut snapshot = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snapshot.dropped = self.dropped.load(Ordering::Relaxed);
        snapshot
    }
}

impl TelemetrySink for OutcomeTelemetry {
    fn record(&self, outcome: &OutcomeRecord) {
        debug!(
            target: TELEMETRY_TARGET,
            request_id = %outcome.request_id,
            success = outcome.success,
            error_code = %outcome.error_code,
            message = %outcome.message,
            "automation outcome"
        );

        let mut counters = match self.counters.try_lock() {
            Ok(counters) => counters,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        counters.total += 1;
        if outcome.success {
            counters.succeeded += 1;
        } else {
            counters.failed += 1;
            *counters
                .by_error_code
                .entry(outcome.error_code.clone())
                .or_default() += 1;
        }
    }
}
