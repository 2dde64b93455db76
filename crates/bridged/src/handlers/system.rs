//! `system_control` and `describe_capabilities`.
//!
//! `system_control` handles engine-level sub-actions and declines anything
//! else so the fallback chain can offer the request to the UI handler.

use std::sync::Arc;

use serde_json::json;

use super::payload::{optional_bool, optional_i64, optional_str};
use crate::dispatch::{Handler, HandlerError, HandlerResult, RequestContext, error_code};
use crate::host::EditorHost;

/// Version reported by `describe_capabilities`.
pub const PLUGIN_VERSION: &str = "1.0.0";

const MAX_QUALITY_LEVEL: i64 = 4;

pub(crate) struct SystemControlHandler {
    editor: Arc<dyn EditorHost>,
}

impl SystemControlHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }

    fn exec(&self, command: &str) -> Result<(), HandlerError> {
        self.editor
            .execute_console_command(command)
            .map_err(|error| HandlerError::new(format!("Failed to execute '{command}': {error}")))
    }

    fn show_fps(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let enabled = optional_bool(ctx.payload(), "enabled")?.unwrap_or(true);
        let command = "stat fps";
        self.exec(command)?;
        let state = if enabled { "enabled" } else { "disabled" };
        ctx.succeed(
            &format!("FPS display {state}"),
            Some(json!({"command": command, "enabled": enabled})),
        );
        Ok(true)
    }

    fn set_quality(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let category = optional_str(ctx.payload(), "category")?
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .ok_or_else(|| HandlerError::invalid_argument("set_quality requires category"))?;
        if !category
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(HandlerError::invalid_argument(format!(
                "Invalid quality category '{category}'"
            )));
        }
        let level = optional_i64(ctx.payload(), "level")?.unwrap_or(1);
        if !(0..=MAX_QUALITY_LEVEL).contains(&level) {
            return Err(HandlerError::invalid_argument(format!(
                "Quality level must be between 0 and {MAX_QUALITY_LEVEL}"
            )));
        }

        let command = format!("sg.{category} {level}");
        self.exec(&command)?;
        ctx.succeed(
            &format!("Set quality {category} to {level}"),
            Some(json!({"command": command, "category": category, "level": level})),
        );
        Ok(true)
    }

    fn screenshot(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let filename = optional_str(ctx.payload(), "filename")?
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("screenshot");
        if filename.contains(char::is_whitespace) {
            return Err(HandlerError::invalid_argument(
                "Screenshot filename must not contain whitespace",
            ));
        }
        let command = format!("screenshot {filename}");
        self.exec(&command)?;
        ctx.succeed(
            &format!("Screenshot captured: {filename}"),
            Some(json!({"command": command, "filename": filename})),
        );
        Ok(true)
    }

    fn engine_version(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let version = self.editor.engine_version();
        ctx.succeed(
            "Engine version retrieved",
            Some(json!({
                "version": version.to_string(),
                "major": version.major,
                "minor": version.minor,
                "patch": version.patch,
            })),
        );
        Ok(true)
    }
}

impl Handler for SystemControlHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let Some(sub_action) = optional_str(ctx.payload(), "action")?
            .map(|action| action.trim().to_ascii_lowercase())
            .filter(|action| !action.is_empty())
        else {
            return Err(HandlerError::invalid_argument(
                "System control requires action parameter",
            ));
        };

        match sub_action.as_str() {
            "show_fps" => self.show_fps(ctx),
            "set_quality" => self.set_quality(ctx),
            "screenshot" => self.screenshot(ctx),
            "get_engine_version" => self.engine_version(ctx),
            "engine_quit" => {
                ctx.fail(
                    "Engine quit command is disabled for safety",
                    error_code::NOT_ALLOWED,
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Reports plugin and engine versions plus every registered action.
pub(crate) struct CapabilitiesHandler {
    editor: Arc<dyn EditorHost>,
}

impl CapabilitiesHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }
}

impl Handler for CapabilitiesHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let actions = ctx.registered_actions();
        ctx.succeed(
            "Capabilities retrieved",
            Some(json!({
                "pluginVersion": PLUGIN_VERSION,
                "engineVersion": self.editor.engine_version().to_string(),
                "actions": actions,
            })),
        );
        Ok(true)
    }
}
