//! Request decoding for the dispatch core.
//!
//! Clients send one JSON object per line:
//!
//! ```json
//! {"requestId":"r1","action":"console_command","payload":{"command":"stat fps"}}
//! ```
//!
//! A missing or `null` payload decodes as an empty object. Any other
//! non-object payload is rejected.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use super::connection::ConnectionHandle;
use super::errors::DispatchError;

/// Payload document carried by a request.
pub type Payload = Map<String, Value>;

/// Decoded automation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationRequest {
    request_id: String,
    action: String,
    payload: Payload,
}

impl AutomationRequest {
    /// Builds a request from already-decoded parts.
    pub fn new(request_id: impl Into<String>, action: impl Into<String>, payload: Payload) -> Self {
        Self {
            request_id: request_id.into(),
            action: action.into(),
            payload,
        }
    }

    /// Parses a JSONL line into a request.
    ///
    /// Surrounding whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedJson`] when the line is empty or not
    /// a JSON object, [`DispatchError::MissingField`] when `requestId` or
    /// `action` is absent or blank, and [`DispatchError::InvalidPayload`] when
    /// `payload` is neither an object nor `null`.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        let value: Value = serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)?;
        let Value::Object(mut envelope) = value else {
            return Err(DispatchError::malformed("request must be a JSON object"));
        };

        let request_id = take_string(&mut envelope, "requestId")?;
        let action = take_string(&mut envelope, "action")?;
        let payload = match envelope.remove("payload") {
            None | Some(Value::Null) => Payload::new(),
            Some(Value::Object(payload)) => payload,
            Some(_) => return Err(DispatchError::invalid_payload("payload must be a JSON object")),
        };

        Ok(Self {
            request_id,
            action: action.trim().to_owned(),
            payload,
        })
    }

    /// Correlation identifier supplied by the caller.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Action name used for handler lookup.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Operation arguments.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }
}

/// Best-effort extraction of `requestId` from a line that failed to decode.
///
/// Used so that decode failures can still be correlated by the client.
#[must_use]
pub fn recover_request_id(line: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(line.trim_ascii()).ok()?;
    value.get("requestId")?.as_str().map(str::to_owned)
}

fn take_string(envelope: &mut Payload, field: &'static str) -> Result<String, DispatchError> {
    match envelope.remove(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text),
        _ => Err(DispatchError::missing_field(field)),
    }
}

/// Request parked while the engine was unsafe to mutate.
///
/// The connection is held weakly; the client may disconnect before the
/// request drains.
#[derive(Debug)]
pub struct PendingRequest {
    request: AutomationRequest,
    connection: ConnectionHandle,
    enqueued_at: Instant,
}

impl PendingRequest {
    /// Captures a request for later processing.
    #[must_use]
    pub fn new(request: AutomationRequest, connection: ConnectionHandle) -> Self {
        Self {
            request,
            connection,
            enqueued_at: Instant::now(),
        }
    }

    /// The parked request.
    #[must_use]
    pub const fn request(&self) -> &AutomationRequest {
        &self.request
    }

    /// Connection awaiting the response.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Time spent in the queue so far.
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Splits the record back into its request and connection.
    #[must_use]
    pub fn into_parts(self) -> (AutomationRequest, ConnectionHandle) {
        (self.request, self.connection)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_full_request() {
        let input = br#"{"requestId":"r1","action":"console_command","payload":{"command":"stat fps"}}"#;
        let request = AutomationRequest::parse(input).expect("parse");
        assert_eq!(request.request_id(), "r1");
        assert_eq!(request.action(), "console_command");
        assert_eq!(request.payload().get("command"), Some(&json!("stat fps")));
    }

    #[rstest]
    #[case(br#"{"requestId":"r1","action":"ping"}"#.as_slice())]
    #[case(br#"{"requestId":"r1","action":"ping","payload":null}"#.as_slice())]
    fn absent_payload_decodes_as_empty_object(#[case] input: &[u8]) {
        let request = AutomationRequest::parse(input).expect("parse");
        assert!(request.payload().is_empty());
    }

    #[test]
    fn trims_whitespace_and_action() {
        let input = b"  {\"requestId\":\"r1\",\"action\":\" ping \"}  \n";
        let request = AutomationRequest::parse(input).expect("parse");
        assert_eq!(request.action(), "ping");
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"   \n".as_slice())]
    #[case(b"not json".as_slice())]
    #[case(b"[1,2,3]".as_slice())]
    fn rejects_malformed_lines(#[case] input: &[u8]) {
        assert!(matches!(
            AutomationRequest::parse(input),
            Err(DispatchError::MalformedJson { .. })
        ));
    }

    #[rstest]
    #[case(br#"{"action":"ping"}"#.as_slice(), "requestId")]
    #[case(br#"{"requestId":7,"action":"ping"}"#.as_slice(), "requestId")]
    #[case(br#"{"requestId":"r1"}"#.as_slice(), "action")]
    #[case(br#"{"requestId":"r1","action":"  "}"#.as_slice(), "action")]
    fn rejects_missing_fields(#[case] input: &[u8], #[case] expected: &str) {
        match AutomationRequest::parse(input) {
            Err(DispatchError::MissingField { field }) => assert_eq!(field, expected),
            other => panic!("expected missing {expected}, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_object_payload() {
        let input = br#"{"requestId":"r1","action":"ping","payload":[1]}"#;
        assert!(matches!(
            AutomationRequest::parse(input),
            Err(DispatchError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn recovers_request_id_from_invalid_request() {
        let input = br#"{"requestId":"r9","payload":{}}"#;
        assert_eq!(recover_request_id(input).as_deref(), Some("r9"));
        assert_eq!(recover_request_id(b"garbage"), None);
    }
}
