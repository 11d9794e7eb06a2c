use super::descriptor::{FieldDescriptor, FieldSpec};
use super::kind::{normalize_tag, FieldKind};
use crate::kernel::path::FieldPath;
use serde_json::{Map, Value};
use tracing::debug;

/// Keys that parameterize a node rather than name a child field.
const META_KEYS: [&str; 7] = ["value", "values", "made", "missed", "options", "list", "type"];

/// Resolve one schema node into a descriptor tree rooted at `path`.
///
/// Never fails. A node that fits no kind and no structural shape becomes a
/// text field.
pub fn interpret(node: &Value, label: &str, path: FieldPath) -> FieldDescriptor {
    let spec = match node {
        Value::Object(map) => interpret_object(map, label, &path),
        other => {
            debug!(field = %path, node = %other, "scalar schema node, treating as string");
            FieldSpec::Text
        }
    };
    FieldDescriptor {
        label: label.to_string(),
        path,
        spec,
    }
}

/// Resolve a top-level section. Sections are always groups; a missing or
/// non-object section is an empty group.
pub fn interpret_section(node: Option<&Value>, label: &str, path: FieldPath) -> FieldDescriptor {
    let children = match node {
        Some(Value::Object(map)) => interpret_children(map, &path),
        Some(other) => {
            debug!(section = label, node = %other, "section is not an object, leaving it empty");
            Vec::new()
        }
        None => Vec::new(),
    };
    FieldDescriptor {
        label: label.to_string(),
        path,
        spec: FieldSpec::Group { children },
    }
}

fn interpret_object(map: &Map<String, Value>, label: &str, path: &FieldPath) -> FieldSpec {
    let tag = meta(map, "type").and_then(Value::as_str).map(normalize_tag);

    if let Some(kind) = tag.as_deref().and_then(FieldKind::from_tag) {
        return tagged(kind, map);
    }

    // boolean-with-value was handled above, so any `value` here marks a pair.
    if meta(map, "made").is_some() || meta(map, "value").is_some() {
        return FieldSpec::ScoringPair {
            points: meta(map, "value").and_then(as_points),
        };
    }

    if let Some(Value::Array(_)) = options_node(map) {
        return FieldSpec::SingleChoice {
            options: options(map),
            values: values(map),
            image: None,
        };
    }

    let children = interpret_children(map, path);
    if children.is_empty() {
        if let Some(tag) = tag {
            debug!(field = label, tag = %tag, "unrecognized field type, treating as string");
            return FieldSpec::Text;
        }
    }
    FieldSpec::Group { children }
}

fn tagged(kind: FieldKind, map: &Map<String, Value>) -> FieldSpec {
    match kind {
        FieldKind::Boolean => FieldSpec::Boolean {
            points: meta(map, "value").and_then(as_points),
        },
        FieldKind::BooleanWithValue => FieldSpec::BooleanWithValue {
            points: meta(map, "value").and_then(coerce_points).unwrap_or(0.0),
        },
        FieldKind::Text => FieldSpec::Text,
        FieldKind::Integer => FieldSpec::Integer,
        FieldKind::Float => FieldSpec::Float,
        FieldKind::SingleChoice => FieldSpec::SingleChoice {
            options: options(map),
            values: values(map),
            image: meta(map, "image").and_then(Value::as_str).map(str::to_string),
        },
        FieldKind::MultipleChoice => FieldSpec::MultipleChoice {
            options: options(map),
            values: values(map),
        },
        FieldKind::Timer => FieldSpec::Timer,
        FieldKind::ImageReference => FieldSpec::ImageReference,
        FieldKind::ScoringPair => FieldSpec::ScoringPair {
            points: meta(map, "value").and_then(as_points),
        },
    }
}

fn interpret_children(map: &Map<String, Value>, path: &FieldPath) -> Vec<FieldDescriptor> {
    map.iter()
        .filter(|(key, _)| !is_meta_key(key))
        .map(|(key, child)| interpret(child, key, path.child(key)))
        .collect()
}

pub fn is_meta_key(key: &str) -> bool {
    META_KEYS.iter().any(|meta| key.eq_ignore_ascii_case(meta))
}

/// Case-insensitive meta lookup: `Value`, `value` and `VALUE` are the same key.
fn meta<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn options_node(map: &Map<String, Value>) -> Option<&Value> {
    meta(map, "options").or_else(|| meta(map, "list"))
}

fn options(map: &Map<String, Value>) -> Vec<String> {
    match options_node(map) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parallel point values; entries that are not numeric count as 0.
fn values(map: &Map<String, Value>) -> Option<Vec<f64>> {
    match meta(map, "values") {
        Some(Value::Array(items)) => Some(items.iter().map(|v| coerce_points(v).unwrap_or(0.0)).collect()),
        _ => None,
    }
}

/// Only JSON numbers. A quoted `"2"` leaves a pair or checkbox unscored.
fn as_points(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Numbers, and strings that parse as numbers. Boolean-with-value points and
/// option value lists are read this way.
fn coerce_points(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
