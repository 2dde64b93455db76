//! `manage_ui`: play-in-editor sessions, saving, and viewport widgets.
//!
//! Also sits behind `system_control` in its fallback chain, so it accepts
//! either top-level action.

use std::sync::Arc;

use serde_json::json;

use super::payload::optional_str;
use crate::dispatch::{Handler, HandlerError, HandlerResult, RequestContext, error_code};
use crate::host::{EditorHost, HostError};

pub(crate) struct UiHandler {
    editor: Arc<dyn EditorHost>,
}

impl UiHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }

    fn play_in_editor(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        if self.editor.is_playing() {
            ctx.fail("Already playing in editor", error_code::ALREADY_PLAYING);
            return Ok(true);
        }
        self.editor.start_play().map_err(|error| {
            HandlerError::new(format!("Failed to start play in editor: {error}"))
        })?;
        ctx.succeed("Started play in editor", Some(json!({"action": action})));
        Ok(true)
    }

    fn stop_play(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        if !self.editor.is_playing() {
            ctx.fail("Not currently playing in editor", error_code::NOT_PLAYING);
            return Ok(true);
        }
        self.editor
            .stop_play()
            .map_err(|error| HandlerError::new(format!("Failed to stop play in editor: {error}")))?;
        ctx.succeed("Stopped play in editor", Some(json!({"action": action})));
        Ok(true)
    }

    fn save_all(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        let saved = self
            .editor
            .save_all()
            .map_err(|error| HandlerError::new(format!("Failed to save all assets: {error}")))?;
        ctx.succeed(
            "Saved all assets",
            Some(json!({"action": action, "saved": saved})),
        );
        Ok(true)
    }

    fn create_widget(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        let name = optional_str(ctx.payload(), "name")?
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| HandlerError::invalid_argument("name field required for create_widget"))?;
        let path = self
            .editor
            .create_widget(name)
            .map_err(|error| HandlerError::new(format!("Failed to create widget: {error}")))?;
        ctx.succeed(
            &format!("Widget blueprint created at {path}"),
            Some(json!({"action": action, "widgetPath": path, "widgetName": name})),
        );
        Ok(true)
    }

    fn remove_widget(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        let name = optional_str(ctx.payload(), "name")?
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let Some(name) = name else {
            let widgets = self.editor.widgets();
            for widget in &widgets {
                self.editor.remove_widget(widget).map_err(|error| {
                    HandlerError::new(format!("Failed to remove widget '{widget}': {error}"))
                })?;
            }
            ctx.succeed(
                "Removed all widgets",
                Some(json!({"action": action, "removed": widgets.len()})),
            );
            return Ok(true);
        };

        match self.editor.remove_widget(name) {
            Ok(()) => {
                ctx.succeed(
                    &format!("Removed widget '{name}'"),
                    Some(json!({"action": action, "removed": 1})),
                );
            }
            Err(HostError::NotFound { .. }) => {
                ctx.fail(
                    &format!("Widget '{name}' not found"),
                    error_code::WIDGET_NOT_FOUND,
                );
            }
            Err(error) => {
                return Err(HandlerError::new(format!(
                    "Failed to remove widget '{name}': {error}"
                )));
            }
        }
        Ok(true)
    }

    fn list_widgets(&self, ctx: &RequestContext<'_>, action: &str) -> HandlerResult {
        let widgets = self.editor.widgets();
        let count = widgets.len();
        ctx.succeed(
            &format!("Found {count} widgets"),
            Some(json!({"action": action, "widgets": widgets, "count": count})),
        );
        Ok(true)
    }
}

impl Handler for UiHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        if !matches!(ctx.action(), "system_control" | "manage_ui") {
            return Ok(false);
        }
        let Some(sub_action) = ctx.sub_action() else {
            return Err(HandlerError::invalid_argument(
                "UI action requires subAction or action parameter",
            ));
        };

        let action = sub_action.as_str();
        match action {
            "play_in_editor" => self.play_in_editor(ctx, action),
            "stop_play" => self.stop_play(ctx, action),
            "save_all" => self.save_all(ctx, action),
            "create_widget" => self.create_widget(ctx, action),
            "remove_widget_from_viewport" => self.remove_widget(ctx, action),
            "list_widgets" => self.list_widgets(ctx, action),
            other => {
                ctx.fail(
                    &format!("UI action '{other}' is not implemented"),
                    error_code::NOT_IMPLEMENTED,
                );
                Ok(true)
            }
        }
    }
}
