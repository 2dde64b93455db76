//! Error types for request decoding and handler failures.
//!
//! Failures that reach a client are reported through the `errorCode` field of
//! the response envelope. The codes live in [`error_code`] so handlers and the
//! dispatcher agree on spelling.

use std::io;

use thiserror::Error;

/// Stable machine-readable identifiers carried in `errorCode`.
pub mod error_code {
    /// The request or its payload could not be decoded.
    pub const INVALID_PAYLOAD: &str = "INVALID_PAYLOAD";
    /// A required argument is missing or has the wrong type.
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    /// The action is recognised but not supported.
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
    /// No handler is registered for the action.
    pub const UNKNOWN_ACTION: &str = "UNKNOWN_ACTION";
    /// The handler attempted the operation and failed.
    pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";
    /// Fallback used when a failure carries no code.
    pub const AUTOMATION_ERROR: &str = "AUTOMATION_ERROR";
    /// A console command was refused by the safety screen.
    pub const COMMAND_BLOCKED: &str = "COMMAND_BLOCKED";
    /// The operation is disabled.
    pub const NOT_ALLOWED: &str = "NOT_ALLOWED";
    /// The deferred queue has reached its limit.
    pub const QUEUE_FULL: &str = "QUEUE_FULL";
    /// The bridge is stopping and will not run the request.
    pub const SHUTTING_DOWN: &str = "SHUTTING_DOWN";
    /// A request frame exceeded the size limit.
    pub const REQUEST_TOO_LARGE: &str = "REQUEST_TOO_LARGE";
    /// A play-in-editor session is already running.
    pub const ALREADY_PLAYING: &str = "ALREADY_PLAYING";
    /// No play-in-editor session is running.
    pub const NOT_PLAYING: &str = "NOT_PLAYING";
    /// The named widget does not exist.
    pub const WIDGET_NOT_FOUND: &str = "WIDGET_NOT_FOUND";
    /// The named foliage type has no instances.
    pub const FOLIAGE_TYPE_NOT_FOUND: &str = "FOLIAGE_TYPE_NOT_FOUND";
}

/// Errors surfaced while decoding requests or writing responses.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request line could not be parsed as valid JSON.
    #[error("malformed request: {message}")]
    MalformedJson {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A required envelope field is missing or not a string.
    #[error("request is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// The payload is present but is not a JSON object.
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },

    /// Request exceeds the maximum allowed size.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// IO error during read or write.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Response serialization failed.
    #[error("failed to serialize response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Returns the wire error code reported to the client.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } | Self::MissingField { .. } | Self::InvalidPayload { .. } => {
                error_code::INVALID_PAYLOAD
            }
            Self::RequestTooLarge { .. } => error_code::REQUEST_TOO_LARGE,
            Self::Io(_) | Self::SerializeResponse(_) => error_code::EXECUTION_FAILED,
        }
    }

    /// Creates a malformed request error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedJson {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJson {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub const fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a request too large error.
    #[must_use]
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }
}

/// Failure returned by a handler instead of responding itself.
///
/// The dispatcher converts it into a failure envelope carrying `code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    code: String,
}

impl HandlerError {
    /// Creates an error reported as [`error_code::EXECUTION_FAILED`].
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(error_code::EXECUTION_FAILED, message)
    }

    /// Creates an error with an explicit code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Creates an [`error_code::INVALID_ARGUMENT`] error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_code(error_code::INVALID_ARGUMENT, message)
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wire error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Errors raised by the deferred queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity; the rejected request is handed back.
    #[error("deferred queue is full ({limit} pending requests)")]
    Full {
        limit: usize,
        request: Box<super::request::PendingRequest>,
    },
}
