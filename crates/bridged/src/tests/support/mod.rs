//! Shared test doubles, harnesses, and scenario worlds.

mod config_loader;
mod editor;
mod harness;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use editor::MockEditor;
pub use harness::DispatchHarness;
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{BridgeWorld, DispatchWorld, bridge_world, dispatch_world};
