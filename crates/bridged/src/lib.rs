//! Dispatch core of an editor automation bridge.
//!
//! Clients connect over a socket configured via [`bridge_config`] and send
//! newline-delimited JSON requests naming an action. The [`dispatch`] module
//! routes each request to the handler registered for that action, always on
//! the single logic thread that may touch editor state, and guarantees that
//! every request receives exactly one response.
//!
//! ## Safety gating
//!
//! The engine is periodically busy saving, collecting garbage, or streaming
//! assets. Requests that arrive during those windows are parked in a FIFO
//! deferred queue and replayed by a periodic drain task once the engine is
//! safe again. A bounded queue answers overflow with `QUEUE_FULL` instead of
//! growing without limit.
//!
//! ## Lifecycle
//!
//! [`bootstrap_with`] loads configuration and installs telemetry.
//! [`BridgeSubsystem::initialize`] then builds the handler registry before the
//! connection manager accepts its first client, and
//! [`BridgeSubsystem::deinitialize`] tears everything down in reverse,
//! answering still-deferred requests with `SHUTTING_DOWN`.

mod bootstrap;
pub mod dispatch;
pub mod handlers;
mod health;
pub mod host;
mod process;
mod subsystem;
mod telemetry;
mod transport;

pub use bootstrap::{Bridge, BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_bridge, run_bridge_with,
};
pub use subsystem::{BridgeSubsystem, LogicThreadSource, SubsystemDeps, SubsystemError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionManager, ListenerError, MessageSink};

#[cfg(test)]
mod tests;
