//! Per-request view handed to handlers.

use std::cell::Cell;

use serde_json::Value;
use tracing::warn;

use super::DISPATCH_TARGET;
use super::connection::ConnectionHandle;
use super::emitter::ResponseEmitter;
use super::registry::HandlerRegistry;
use super::request::Payload;

/// Guards the exactly-once response rule for a single request.
///
/// The first response wins; later attempts are logged and discarded.
pub(crate) struct Responder<'a> {
    emitter: &'a ResponseEmitter,
    connection: &'a ConnectionHandle,
    request_id: &'a str,
    responded: Cell<bool>,
}

impl<'a> Responder<'a> {
    pub(crate) const fn new(
        emitter: &'a ResponseEmitter,
        connection: &'a ConnectionHandle,
        request_id: &'a str,
    ) -> Self {
        Self {
            emitter,
            connection,
            request_id,
            responded: Cell::new(false),
        }
    }

    pub(crate) fn has_responded(&self) -> bool {
        self.responded.get()
    }

    pub(crate) const fn request_id(&self) -> &'a str {
        self.request_id
    }

    pub(crate) const fn connection(&self) -> &ConnectionHandle {
        self.connection
    }

    pub(crate) fn succeed(&self, message: &str, result: Option<Value>) -> bool {
        if !self.claim(message) {
            return false;
        }
        self.emitter
            .send_success(self.connection, self.request_id, message, result)
    }

    pub(crate) fn fail(&self, message: &str, error_code: &str) -> bool {
        if !self.claim(message) {
            return false;
        }
        self.emitter
            .send_error(self.connection, self.request_id, message, error_code)
    }

    fn claim(&self, message: &str) -> bool {
        if self.responded.replace(true) {
            warn!(
                target: DISPATCH_TARGET,
                request_id = self.request_id,
                message = %super::emitter::sanitize_for_log(message),
                "duplicate response suppressed"
            );
            return false;
        }
        true
    }
}

/// Request data and response surface passed to a [`Handler`].
///
/// [`Handler`]: super::registry::Handler
pub struct RequestContext<'a> {
    request_id: &'a str,
    action: &'a str,
    payload: &'a Payload,
    responder: &'a Responder<'a>,
    registry: &'a HandlerRegistry,
}

impl<'a> RequestContext<'a> {
    pub(crate) const fn new(
        request_id: &'a str,
        action: &'a str,
        payload: &'a Payload,
        responder: &'a Responder<'a>,
        registry: &'a HandlerRegistry,
    ) -> Self {
        Self {
            request_id,
            action,
            payload,
            responder,
            registry,
        }
    }

    /// Correlation identifier supplied by the caller.
    #[must_use]
    pub const fn request_id(&self) -> &str {
        self.request_id
    }

    /// Action being handled.
    #[must_use]
    pub const fn action(&self) -> &str {
        self.action
    }

    /// Operation arguments.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        self.payload
    }

    /// Connection that will receive the response.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionHandle {
        self.responder.connection()
    }

    /// Nested sub-operation, read from `subAction` then `action`, lowercased.
    #[must_use]
    pub fn sub_action(&self) -> Option<String> {
        ["subAction", "action"]
            .into_iter()
            .filter_map(|field| self.payload.get(field).and_then(Value::as_str))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_ascii_lowercase)
    }

    /// Sorted names of every registered action.
    #[must_use]
    pub fn registered_actions(&self) -> Vec<&str> {
        self.registry.actions()
    }

    /// Sends a success response. Returns false if a response was already sent
    /// or the connection has closed.
    pub fn succeed(&self, message: &str, result: Option<Value>) -> bool {
        self.responder.succeed(message, result)
    }

    /// Sends a failure response. Returns false if a response was already sent
    /// or the connection has closed.
    pub fn fail(&self, message: &str, error_code: &str) -> bool {
        self.responder.fail(message, error_code)
    }

    /// Whether a response has been sent for this request.
    #[must_use]
    pub fn has_responded(&self) -> bool {
        self.responder.has_responded()
    }
}
