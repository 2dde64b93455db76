//! Response and telemetry emission.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::connection::ConnectionHandle;
use super::outcomes::{OutcomeRecord, TelemetrySink};
use super::response::{ResponseEnvelope, normalise_error_code};

/// Longest message, in characters, written to logs and telemetry.
pub const MAX_LOGGED_MESSAGE_CHARS: usize = 512;
const TRUNCATION_MARKER: &str = "[TRUNCATED]";

/// Sends envelopes to connections and reports every outcome to telemetry.
#[derive(Clone)]
pub struct ResponseEmitter {
    telemetry: Arc<dyn TelemetrySink>,
}

impl ResponseEmitter {
    /// Builds an emitter reporting to `telemetry`.
    #[must_use]
    pub fn new(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { telemetry }
    }

    /// Sends `envelope` and records its outcome.
    ///
    /// Returns whether the connection accepted the write. A closed connection
    /// is not an error; the response is dropped.
    pub fn send_response(&self, connection: &ConnectionHandle, envelope: &ResponseEnvelope) -> bool {
        let delivered = connection.send(envelope);
        if !delivered {
            debug!(
                target: DISPATCH_TARGET,
                request_id = envelope.request_id(),
                connection = connection.id(),
                "connection closed; response dropped"
            );
        }
        self.record_telemetry(
            envelope.request_id(),
            envelope.is_success(),
            envelope.message(),
            envelope.error_code(),
        );
        delivered
    }

    /// Sends a success envelope.
    pub fn send_success(
        &self,
        connection: &ConnectionHandle,
        request_id: &str,
        message: &str,
        result: Option<Value>,
    ) -> bool {
        self.send_response(
            connection,
            &ResponseEnvelope::success(request_id, message, result),
        )
    }

    /// Sends a failure envelope and logs it. A blank `error_code` becomes
    /// `AUTOMATION_ERROR`.
    pub fn send_error(
        &self,
        connection: &ConnectionHandle,
        request_id: &str,
        message: &str,
        error_code: &str,
    ) -> bool {
        let code = normalise_error_code(error_code);
        warn!(
            target: DISPATCH_TARGET,
            request_id,
            error_code = code,
            message = %sanitize_for_log(message),
            "automation request failed"
        );
        self.send_response(
            connection,
            &ResponseEnvelope::failure(request_id, message, code),
        )
    }

    /// Forwards an outcome to the telemetry sink, swallowing sink panics.
    pub fn record_telemetry(&self, request_id: &str, success: bool, message: &str, error_code: &str) {
        let outcome = OutcomeRecord {
            request_id: request_id.to_owned(),
            success,
            message: sanitize_for_log(message),
            error_code: error_code.to_owned(),
        };
        let sink = &self.telemetry;
        if panic::catch_unwind(AssertUnwindSafe(|| sink.record(&outcome))).is_err() {
            debug!(target: DISPATCH_TARGET, request_id, "telemetry sink panicked");
        }
    }
}

/// Replaces control characters with `?` and caps the length.
#[must_use]
pub fn sanitize_for_log(input: &str) -> String {
    let mut sanitized: String = input
        .chars()
        .take(MAX_LOGGED_MESSAGE_CHARS)
        .map(|ch| if ch.is_ascii_control() { '?' } else { ch })
        .collect();
    if input.chars().nth(MAX_LOGGED_MESSAGE_CHARS).is_some() {
        sanitized.push_str(TRUNCATION_MARKER);
    }
    sanitized
}
