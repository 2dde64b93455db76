//! Automation subsystem lifecycle.
//!
//! Start-up order matters: the registry is complete before the dispatcher is
//! built, and the dispatcher exists before the connection manager accepts its
//! first client, so no request can observe a partially registered handler
//! set. Shutdown runs in reverse.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bridge_config::{Config, SocketEndpoint};
use thiserror::Error;
use tracing::{info, warn};

use crate::dispatch::{
    Dispatcher, DispatcherDeps, DrainTask, Handler, HandlerRegistry, OutcomeTelemetry,
    TelemetrySnapshot,
};
use crate::handlers::register_builtin_handlers;
use crate::health::HealthReporter;
use crate::host::{
    EditorHost, EngineSafetyProbe, HeadlessEditor, LogicThread, LogicThreadError,
    LogicThreadHandle, SafetyFlags,
};
use crate::transport::{ConnectionManager, ListenerError, MessageSink};

const SUBSYSTEM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::subsystem");
const LOGIC_THREAD_NAME: &str = "bridged-logic";

/// Where handlers run.
pub enum LogicThreadSource {
    /// Spawn and own a dedicated logic thread.
    Spawn,
    /// Use a thread the embedding host already pumps.
    Adopt(LogicThreadHandle),
}

/// Collaborators supplied by the host.
pub struct SubsystemDeps {
    /// Editor operations used by the built-in handlers.
    pub editor: Arc<dyn EditorHost>,
    /// Engine safety state consulted before every handler run.
    pub safety: Arc<dyn EngineSafetyProbe>,
    /// Outcome sink shared with the dispatcher.
    pub telemetry: Arc<OutcomeTelemetry>,
    /// Logic thread to use.
    pub logic_thread: LogicThreadSource,
    /// Handlers registered after the built-in set; a name already in use
    /// replaces the built-in handler.
    pub extra_handlers: Vec<(String, Arc<dyn Handler>)>,
}

impl SubsystemDeps {
    /// Headless editor, fresh safety flags, and a spawned logic thread.
    #[must_use]
    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessEditor::default()), Arc::new(SafetyFlags::new()))
    }

    /// Uses `editor` and `safety` with a spawned logic thread.
    #[must_use]
    pub fn new(editor: Arc<dyn EditorHost>, safety: Arc<dyn EngineSafetyProbe>) -> Self {
        Self {
            editor,
            safety,
            telemetry: Arc::new(OutcomeTelemetry::new()),
            logic_thread: LogicThreadSource::Spawn,
            extra_handlers: Vec::new(),
        }
    }
}

/// Errors raised while starting or stopping the subsystem.
#[derive(Debug, Error)]
pub enum SubsystemError {
    /// The logic thread could not be started or stopped cleanly.
    #[error("logic thread failure: {source}")]
    LogicThread {
        /// Underlying logic thread error.
        #[from]
        source: LogicThreadError,
    },
    /// The connection manager could not be started or stopped cleanly.
    #[error("connection manager failure: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// The drain task thread could not be spawned.
    #[error("failed to start drain task: {source}")]
    DrainTask {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

/// Running automation subsystem.
pub struct BridgeSubsystem {
    dispatcher: Dispatcher,
    telemetry: Arc<OutcomeTelemetry>,
    reporter: Arc<dyn HealthReporter>,
    drain: Option<DrainTask>,
    connections: Option<ConnectionManager>,
    logic: Option<LogicThread>,
}

impl BridgeSubsystem {
    /// Starts the logic thread, registry, dispatcher, connection manager, and
    /// drain task, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`SubsystemError`] if any component fails to start. Components
    /// already started are stopped before returning.
    pub fn initialize(
        config: &Config,
        deps: SubsystemDeps,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, SubsystemError> {
        let SubsystemDeps {
            editor,
            safety,
            telemetry,
            logic_thread,
            extra_handlers,
        } = deps;

        let (logic, logic_handle) = match logic_thread {
            LogicThreadSource::Spawn => {
                let thread = LogicThread::spawn(LOGIC_THREAD_NAME)?;
                let handle = thread.handle();
                (Some(thread), handle)
            }
            LogicThreadSource::Adopt(handle) => (None, handle),
        };

        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry, &editor);
        for (action, handler) in extra_handlers {
            registry.register(action, handler);
        }
        info!(
            target: SUBSYSTEM_TARGET,
            handlers = registry.len(),
            "handler registry ready"
        );

        let dispatcher = Dispatcher::new(
            registry,
            DispatcherDeps {
                logic_thread: logic_handle,
                safety,
                telemetry: telemetry.clone(),
                queue_limit: config.queue_limit(),
            },
        );

        let mut subsystem = Self {
            dispatcher,
            telemetry,
            reporter,
            drain: None,
            connections: None,
            logic,
        };

        let sink: Arc<dyn MessageSink> = Arc::new(subsystem.dispatcher.clone());
        let connections = ConnectionManager::start(config.daemon_socket(), sink)?;
        subsystem
            .reporter
            .listener_started(connections.endpoint());
        subsystem.connections = Some(connections);

        let drain = DrainTask::start(subsystem.dispatcher.clone(), config.drain_interval())
            .map_err(|source| SubsystemError::DrainTask { source })?;
        subsystem.drain = Some(drain);

        Ok(subsystem)
    }

    /// Dispatcher serving this subsystem.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Configured endpoint, while the connection manager is running.
    #[must_use]
    pub fn endpoint(&self) -> Option<&SocketEndpoint> {
        self.connections.as_ref().map(ConnectionManager::endpoint)
    }

    /// Bound TCP address, if listening on TCP.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connections
            .as_ref()
            .and_then(ConnectionManager::local_addr)
    }

    /// Number of connected clients.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.connections
            .as_ref()
            .map_or(0, ConnectionManager::active_connections)
    }

    /// Current outcome counters.
    #[must_use]
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    /// Stops the drain task, the connection manager, and the logic thread.
    ///
    /// Deferred requests still queued are answered with `SHUTTING_DOWN`.
    /// Returns the final outcome counters.
    ///
    /// # Errors
    ///
    /// Returns the first [`SubsystemError`] met while stopping; every
    /// component is still asked to stop.
    pub fn deinitialize(mut self) -> Result<TelemetrySnapshot, SubsystemError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<TelemetrySnapshot, SubsystemError> {
        if let Some(drain) = self.drain.take() {
            drain.stop();
        }
        self.dispatcher.abandon_pending();

        let listener_result = self
            .connections
            .take()
            .map_or(Ok(()), ConnectionManager::stop);
        let logic_result = self.logic.take().map_or(Ok(()), LogicThread::shutdown);
        // Jobs that ran during logic thread shutdown may have deferred again.
        self.dispatcher.abandon_pending();

        let snapshot = self.telemetry.snapshot();
        self.reporter.subsystem_stopped(&snapshot);
        listener_result?;
        logic_result?;
        Ok(snapshot)
    }
}

impl Drop for BridgeSubsystem {
    fn drop(&mut self) {
        if self.drain.is_none() && self.connections.is_none() && self.logic.is_none() {
            return;
        }
        if let Err(error) = self.shutdown() {
            warn!(target: SUBSYSTEM_TARGET, %error, "subsystem did not stop cleanly");
        }
    }
}
