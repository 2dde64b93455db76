//! `build_environment` and the foliage actions.
//!
//! Foliage sub-actions of `build_environment` are rerouted by the
//! dispatcher's structural rules before reaching this module, so
//! [`BuildEnvironmentHandler`] never sees them.

use std::sync::Arc;

use serde_json::{Value, json};

use super::payload::{optional_bool, optional_f64, optional_str, required_str};
use crate::dispatch::{Handler, HandlerError, HandlerResult, RequestContext, error_code};
use crate::host::{EditorHost, HostError, Vector3};

const DEFAULT_SKY_SPHERE_NAME: &str = "SkySphere";

pub(crate) struct BuildEnvironmentHandler {
    editor: Arc<dyn EditorHost>,
}

impl BuildEnvironmentHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }

    fn set_time_of_day(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let hour = optional_f64(ctx.payload(), "hour")?
            .ok_or_else(|| HandlerError::invalid_argument("hour is required"))?;
        if !(0.0..=24.0).contains(&hour) {
            return Err(HandlerError::invalid_argument(
                "hour must be between 0 and 24",
            ));
        }
        self.editor
            .set_time_of_day(hour)
            .map_err(|error| HandlerError::new(format!("Failed to set time of day: {error}")))?;
        ctx.succeed(
            &format!("Time of day set to {hour}"),
            Some(json!({"hour": hour})),
        );
        Ok(true)
    }

    fn create_sky_sphere(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let name = optional_str(ctx.payload(), "name")?
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SKY_SPHERE_NAME);
        let actor = self
            .editor
            .create_sky_sphere(name)
            .map_err(|error| HandlerError::new(format!("Failed to create sky sphere: {error}")))?;
        ctx.succeed(
            &format!("Sky sphere '{actor}' created"),
            Some(json!({"actorName": actor})),
        );
        Ok(true)
    }
}

impl Handler for BuildEnvironmentHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let Some(sub_action) = ctx.sub_action() else {
            return Err(HandlerError::invalid_argument(
                "build_environment requires action parameter",
            ));
        };
        match sub_action.as_str() {
            "set_time_of_day" => self.set_time_of_day(ctx),
            "create_sky_sphere" => self.create_sky_sphere(ctx),
            other => {
                ctx.fail(
                    &format!("Environment action '{other}' is not implemented"),
                    error_code::NOT_IMPLEMENTED,
                );
                Ok(true)
            }
        }
    }
}

/// Serves `paint_foliage`, `get_foliage_instances` and `remove_foliage`.
pub(crate) struct FoliageHandler {
    editor: Arc<dyn EditorHost>,
}

impl FoliageHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }

    fn paint(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let foliage_type = required_str(ctx.payload(), "foliageTypePath")?;
        let locations = parse_locations(ctx.payload().get("locations"))?;
        let added = self
            .editor
            .paint_foliage(foliage_type, &locations)
            .map_err(|error| HandlerError::new(format!("Failed to paint foliage: {error}")))?;
        ctx.succeed(
            &format!("Painted {added} foliage instances"),
            Some(json!({"foliageTypePath": foliage_type, "instancesAdded": added})),
        );
        Ok(true)
    }

    fn list(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let filter = optional_str(ctx.payload(), "foliageTypePath")?.filter(|path| !path.is_empty());
        let instances: Vec<_> = self
            .editor
            .foliage_instances()
            .into_iter()
            .filter(|instance| filter.is_none_or(|path| instance.foliage_type_path == path))
            .collect();
        let count = instances.len();
        ctx.succeed(
            &format!("Found {count} foliage instances"),
            Some(json!({"instances": instances, "count": count})),
        );
        Ok(true)
    }

    fn remove(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let foliage_type = optional_str(ctx.payload(), "foliageTypePath")?.filter(|path| !path.is_empty());
        let remove_all = optional_bool(ctx.payload(), "removeAll")?.unwrap_or(false);

        let removed = match (foliage_type, remove_all) {
            (Some(foliage_type), _) => match self.editor.remove_foliage(foliage_type) {
                Ok(removed) => removed,
                Err(HostError::NotFound { .. }) => {
                    ctx.fail(
                        &format!("Foliage type '{foliage_type}' not found"),
                        error_code::FOLIAGE_TYPE_NOT_FOUND,
                    );
                    return Ok(true);
                }
                Err(error) => {
                    return Err(HandlerError::new(format!(
                        "Failed to remove foliage: {error}"
                    )));
                }
            },
            (None, true) => self.editor.clear_foliage(),
            (None, false) => {
                return Err(HandlerError::invalid_argument(
                    "foliageTypePath or removeAll is required",
                ));
            }
        };
        ctx.succeed(
            &format!("Removed {removed} foliage instances"),
            Some(json!({"instancesRemoved": removed})),
        );
        Ok(true)
    }
}

impl Handler for FoliageHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        match ctx.action() {
            "paint_foliage" => self.paint(ctx),
            "get_foliage_instances" => self.list(ctx),
            "remove_foliage" => self.remove(ctx),
            _ => Ok(false),
        }
    }
}

fn parse_locations(value: Option<&Value>) -> Result<Vec<Vector3>, HandlerError> {
    let Some(Value::Array(entries)) = value else {
        return Err(HandlerError::invalid_argument("locations must be an array"));
    };
    entries
        .iter()
        .map(|entry| {
            let Value::Object(location) = entry else {
                return Err(HandlerError::invalid_argument(
                    "each location must be an object",
                ));
            };
            let axis = |name: &str| location.get(name).and_then(Value::as_f64).unwrap_or(0.0);
            Ok(Vector3 {
                x: axis("x"),
                y: axis("y"),
                z: axis("z"),
            })
        })
        .collect()
}
