//! Request dispatch core.
//!
//! Clients send one JSON request per line:
//!
//! ```json
//! {"requestId":"r1","action":"console_command","payload":{"command":"stat fps"}}
//! ```
//!
//! and receive exactly one response per request:
//!
//! ```json
//! {"requestId":"r1","success":true,"message":"Executed console command: stat fps","result":{"command":"stat fps","executed":true},"errorCode":""}
//! ```
//!
//! ## Flow
//!
//! The [`Dispatcher`] hops every request onto the logic thread. While the
//! engine is saving, collecting garbage, or streaming assets the request is
//! parked in the [`DeferredQueue`] and replayed by the [`DrainTask`] once the
//! engine is safe. Safe requests are matched against the structural routing
//! rules, then against the [`HandlerRegistry`] and its fallback chains.
//! Responses and their telemetry go through the [`ResponseEmitter`].

mod connection;
mod context;
mod dispatcher;
mod drain;
mod emitter;
mod errors;
mod outcomes;
mod queue;
mod registry;
mod request;
mod response;
mod routing;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

pub use self::connection::{ConnectionHandle, ConnectionId, ResponseChannel};
pub use self::context::RequestContext;
pub use self::dispatcher::{Dispatcher, DispatcherDeps};
pub use self::drain::DrainTask;
pub use self::emitter::{MAX_LOGGED_MESSAGE_CHARS, ResponseEmitter, sanitize_for_log};
pub use self::errors::{DispatchError, HandlerError, QueueError, error_code};
pub use self::outcomes::{OutcomeRecord, OutcomeTelemetry, TelemetrySink, TelemetrySnapshot};
pub use self::queue::DeferredQueue;
pub use self::registry::{Handler, HandlerRegistry, HandlerResult};
pub use self::request::{AutomationRequest, Payload, PendingRequest, recover_request_id};
pub use self::response::{ResponseEnvelope, ResponseWriter, normalise_error_code};
pub use self::routing::{StructuralRoute, structural_route};
