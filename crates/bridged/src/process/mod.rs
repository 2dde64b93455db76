//! Process entry point: bootstrap, run the subsystem, wait for a signal.

mod shutdown;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::subsystem::{BridgeSubsystem, SubsystemDeps, SubsystemError};

pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors surfaced while running the bridge process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the bridge failed.
    #[error("bridge bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[from]
        source: BootstrapError,
    },
    /// The automation subsystem failed to start or stop.
    #[error("automation subsystem failed: {source}")]
    Subsystem {
        /// Underlying subsystem error.
        #[from]
        source: SubsystemError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[from]
        source: ShutdownError,
    },
}

/// Runs the bridge with the production collaborators and a headless editor.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, start-up, signal handling, or
/// shutdown fails.
pub fn run_bridge() -> Result<(), LaunchError> {
    run_bridge_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        SubsystemDeps::headless(),
        &SystemShutdownSignal,
    )
}

/// Runs the bridge with injected collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, start-up, signal handling, or
/// shutdown fails.
pub fn run_bridge_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    deps: SubsystemDeps,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let bridge = bootstrap_with(loader, reporter.as_ref())?;
    let subsystem = BridgeSubsystem::initialize(bridge.config(), deps, reporter)?;
    info!(
        target: PROCESS_TARGET,
        socket = %bridge.config().daemon_socket(),
        "bridge running"
    );

    let waited = shutdown.wait();
    let stopped = subsystem.deinitialize();
    waited?;
    let snapshot = stopped?;
    info!(
        target: PROCESS_TARGET,
        answered = snapshot.total,
        "shutdown sequence completed"
    );
    Ok(())
}
