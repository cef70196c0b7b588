//! Schema validation for Pip JSON5 configuration layers.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Expected JSON shape of a leaf setting.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    String,
    Bool,
    Integer,
    Number,
    OptionalString,
}

/// Allowed keys and value kinds for each top-level section.
const SECTIONS: &[(&str, &[(&str, FieldKind)])] = &[
    (
        "assistant",
        &[
            ("name", FieldKind::String),
            ("history_window", FieldKind::Integer),
        ],
    ),
    (
        "classifier",
        &[
            ("confidence_threshold", FieldKind::Number),
            ("context_messages", FieldKind::Integer),
            ("model_fallback", FieldKind::Bool),
        ],
    ),
    (
        "recommender",
        &[
            ("top_n", FieldKind::Integer),
            ("candidate_pool", FieldKind::Integer),
            ("knowledge_top_k", FieldKind::Integer),
            ("relaxed_retry", FieldKind::Bool),
        ],
    ),
    ("decide", &[("min_relevance", FieldKind::Number)]),
    (
        "photo",
        &[
            ("min_confidence", FieldKind::Number),
            ("confident_above", FieldKind::Number),
        ],
    ),
    (
        "llm",
        &[
            ("provider", FieldKind::String),
            ("model", FieldKind::String),
            ("api_key_env", FieldKind::String),
        ],
    ),
    (
        "data",
        &[
            ("catalog_path", FieldKind::OptionalString),
            ("knowledge_path", FieldKind::OptionalString),
            ("store_path", FieldKind::OptionalString),
        ],
    ),
];

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    for (key, value) in map {
        if key == "$schema" {
            if value.as_str().is_none() {
                return Err(invalid_field(layer, key, "expected string"));
            }
            continue;
        }
        let Some((_, fields)) = SECTIONS.iter().find(|(name, _)| name == key) else {
            return Err(invalid_field(layer, key, "unknown key"));
        };
        validate_section(value, fields, layer, key)?;
    }
    Ok(())
}

fn validate_section(
    value: &Value,
    fields: &[(&str, FieldKind)],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    for (key, value) in map {
        let field_path = format!("{path}.{key}");
        let Some((_, kind)) = fields.iter().find(|(name, _)| name == key) else {
            return Err(invalid_field(layer, &field_path, "unknown key"));
        };
        let ok = match kind {
            FieldKind::String => value.is_string(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Integer => value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::OptionalString => value.is_string() || value.is_null(),
        };
        if !ok {
            let expected = match kind {
                FieldKind::String => "expected string",
                FieldKind::Bool => "expected bool",
                FieldKind::Integer => "expected non-negative integer",
                FieldKind::Number => "expected number",
                FieldKind::OptionalString => "expected string or null",
            };
            return Err(invalid_field(layer, &field_path, expected));
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
