//! Socket transport for the bridge.
//!
//! The [`ConnectionManager`] binds the configured endpoint, accepts clients on
//! a background thread, reads newline-delimited JSON requests, and hands each
//! decoded request to a [`MessageSink`] together with a weak
//! [`ConnectionHandle`](crate::dispatch::ConnectionHandle) for the reply.

mod connections;
mod errors;
mod framing;
mod handler;
mod listener;

pub use self::connections::{ConnectionManager, MessageSink};
pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
