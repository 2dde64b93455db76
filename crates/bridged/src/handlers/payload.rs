//! Typed accessors for request payload fields.
//!
//! Each accessor turns a missing or mistyped field into an
//! `INVALID_ARGUMENT` [`HandlerError`] naming the field.

use serde_json::Value;

use crate::dispatch::{HandlerError, Payload};

/// Reads a required, non-blank string field.
pub(crate) fn required_str<'a>(payload: &'a Payload, field: &str) -> Result<&'a str, HandlerError> {
    optional_str(payload, field)?
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| HandlerError::invalid_argument(format!("{field} is required")))
}

/// Reads an optional string field. `null` counts as absent.
pub(crate) fn optional_str<'a>(payload: &'a Payload, field: &str) -> Result<Option<&'a str>, HandlerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(HandlerError::invalid_argument(format!(
            "{field} must be a string"
        ))),
    }
}

/// Reads an optional boolean field.
pub(crate) fn optional_bool(payload: &Payload, field: &str) -> Result<Option<bool>, HandlerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(HandlerError::invalid_argument(format!(
            "{field} must be a boolean"
        ))),
    }
}

/// Reads an optional numeric field.
pub(crate) fn optional_f64(payload: &Payload, field: &str) -> Result<Option<f64>, HandlerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerError::invalid_argument(format!("{field} must be a number"))),
    }
}

/// Reads an optional integer field.
pub(crate) fn optional_i64(payload: &Payload, field: &str) -> Result<Option<i64>, HandlerError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerError::invalid_argument(format!("{field} must be an integer"))),
    }
}
