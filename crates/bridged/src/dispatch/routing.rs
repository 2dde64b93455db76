//! Structural dispatch rules.
//!
//! Some composite actions name a sub-operation owned by a more specific
//! handler. These rules run before registry lookup and send the request
//! straight to that handler with its payload reshaped, so one request never
//! reaches two handlers.

use serde_json::{Map, Value, json};

use super::request::Payload;

/// Rewritten destination for a request matched by a structural rule.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralRoute {
    /// Action whose handler receives the request.
    pub target: &'static str,
    /// Payload in the shape the target expects.
    pub payload: Payload,
}

struct StructuralRule {
    action: &'static str,
    sub_action: &'static str,
    target: &'static str,
    rewrite: fn(&Payload) -> Payload,
}

const RULES: &[StructuralRule] = &[
    StructuralRule {
        action: "build_environment",
        sub_action: "add_foliage_instances",
        target: "paint_foliage",
        rewrite: rewrite_add_foliage_instances,
    },
    StructuralRule {
        action: "build_environment",
        sub_action: "get_foliage_instances",
        target: "get_foliage_instances",
        rewrite: rewrite_get_foliage_instances,
    },
    StructuralRule {
        action: "build_environment",
        sub_action: "remove_foliage",
        target: "remove_foliage",
        rewrite: rewrite_remove_foliage,
    },
];

/// Matches `action` and the payload's `action` field against the rule set.
#[must_use]
pub fn structural_route(action: &str, payload: &Payload) -> Option<StructuralRoute> {
    let sub_action = payload.get("action").and_then(Value::as_str)?.trim();
    RULES
        .iter()
        .find(|rule| rule.action == action && rule.sub_action.eq_ignore_ascii_case(sub_action))
        .map(|rule| StructuralRoute {
            target: rule.target,
            payload: (rule.rewrite)(payload),
        })
}

fn foliage_type_path(payload: &Payload) -> Payload {
    let mut rewritten = Map::new();
    if let Some(path) = payload
        .get("foliageType")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
    {
        rewritten.insert("foliageTypePath".to_owned(), Value::from(path));
    }
    rewritten
}

fn rewrite_add_foliage_instances(payload: &Payload) -> Payload {
    let locations: Vec<Value> = payload
        .get("transforms")
        .and_then(Value::as_array)
        .map(|transforms| {
            transforms
                .iter()
                .filter_map(|transform| transform.get("location").filter(|loc| loc.is_object()))
                .map(|location| {
                    let axis = |name: &str| location.get(name).and_then(Value::as_f64).unwrap_or(0.0);
                    json!({"x": axis("x"), "y": axis("y"), "z": axis("z")})
                })
                .collect()
        })
        .unwrap_or_default();

    let mut rewritten = foliage_type_path(payload);
    rewritten.insert("locations".to_owned(), Value::Array(locations));
    rewritten
}

fn rewrite_get_foliage_instances(payload: &Payload) -> Payload {
    foliage_type_path(payload)
}

fn rewrite_remove_foliage(payload: &Payload) -> Payload {
    let remove_all = payload
        .get("removeAll")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let mut rewritten = foliage_type_path(payload);
    rewritten.insert("removeAll".to_owned(), Value::Bool(remove_all));
    rewritten
}
