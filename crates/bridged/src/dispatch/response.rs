//! Response envelope and JSONL writer.
//!
//! Every request receives one envelope:
//!
//! ```json
//! {"requestId":"r1","success":false,"message":"...","result":null,"errorCode":"COMMAND_BLOCKED"}
//! ```
//!
//! `errorCode` is empty on success and never empty on failure.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{DispatchError, error_code};

/// Uniform outbound response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    request_id: String,
    success: bool,
    message: String,
    result: Option<Value>,
    error_code: String,
}

impl ResponseEnvelope {
    /// Builds a success envelope.
    pub fn success(
        request_id: impl Into<String>,
        message: impl Into<String>,
        result: Option<Value>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            message: message.into(),
            result,
            error_code: String::new(),
        }
    }

    /// Builds a failure envelope. A blank code becomes
    /// [`error_code::AUTOMATION_ERROR`].
    pub fn failure(
        request_id: impl Into<String>,
        message: impl Into<String>,
        code: &str,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            message: message.into(),
            result: None,
            error_code: normalise_error_code(code).to_owned(),
        }
    }

    /// Correlation identifier echoed from the request.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Human-readable outcome.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured result, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Machine-readable error code; empty on success.
    #[must_use]
    pub fn error_code(&self) -> &str {
        &self.error_code
    }
}

/// Maps a blank error code to [`error_code::AUTOMATION_ERROR`].
#[must_use]
pub fn normalise_error_code(code: &str) -> &str {
    if code.trim().is_empty() {
        error_code::AUTOMATION_ERROR
    } else {
        code
    }
}

/// Writer that frames envelopes as JSONL.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one envelope as a JSONL line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_envelope(&mut self, envelope: &ResponseEnvelope) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, envelope)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
