//! Built-in action handlers.
//!
//! [`register_builtin_handlers`] installs every handler the bridge ships
//! with. Handlers only talk to the editor through [`EditorHost`], so the same
//! set runs against a live engine or a [`crate::host::HeadlessEditor`].

mod console;
mod environment;
mod payload;
mod system;
mod ui;

use std::sync::Arc;

use crate::dispatch::{Handler, HandlerRegistry};
use crate::host::EditorHost;

pub use system::PLUGIN_VERSION;

/// Action names served by the built-in handlers.
pub mod action {
    /// Screened console command execution.
    pub const CONSOLE_COMMAND: &str = "console_command";
    /// Engine-level controls; falls back to [`MANAGE_UI`].
    pub const SYSTEM_CONTROL: &str = "system_control";
    /// Play sessions, saving, and widgets.
    pub const MANAGE_UI: &str = "manage_ui";
    /// Lighting and sky; foliage sub-actions are rerouted.
    pub const BUILD_ENVIRONMENT: &str = "build_environment";
    /// Paint foliage instances.
    pub const PAINT_FOLIAGE: &str = "paint_foliage";
    /// List foliage instances.
    pub const GET_FOLIAGE_INSTANCES: &str = "get_foliage_instances";
    /// Remove foliage instances.
    pub const REMOVE_FOLIAGE: &str = "remove_foliage";
    /// Versions and registered actions.
    pub const DESCRIBE_CAPABILITIES: &str = "describe_capabilities";
}

/// Registers the built-in handlers and the `system_control` fallback chain.
pub fn register_builtin_handlers(registry: &mut HandlerRegistry, editor: &Arc<dyn EditorHost>) {
    registry.register(
        action::CONSOLE_COMMAND,
        Arc::new(console::ConsoleCommandHandler::new(Arc::clone(editor))),
    );
    registry.register(
        action::SYSTEM_CONTROL,
        Arc::new(system::SystemControlHandler::new(Arc::clone(editor))),
    );
    registry.register(
        action::MANAGE_UI,
        Arc::new(ui::UiHandler::new(Arc::clone(editor))),
    );
    registry.register(
        action::BUILD_ENVIRONMENT,
        Arc::new(environment::BuildEnvironmentHandler::new(Arc::clone(editor))),
    );

    let foliage: Arc<dyn Handler> = Arc::new(environment::FoliageHandler::new(Arc::clone(editor)));
    for name in [
        action::PAINT_FOLIAGE,
        action::GET_FOLIAGE_INSTANCES,
        action::REMOVE_FOLIAGE,
    ] {
        registry.register(name, Arc::clone(&foliage));
    }

    registry.register(
        action::DESCRIBE_CAPABILITIES,
        Arc::new(system::CapabilitiesHandler::new(Arc::clone(editor))),
    );
    registry.set_fallbacks(action::SYSTEM_CONTROL, [action::MANAGE_UI]);
}
