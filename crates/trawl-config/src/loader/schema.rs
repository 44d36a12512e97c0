//! Schema validation helpers for trawl JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = ["$schema", "crawl", "memory", "router", "dispatch"];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("crawl") {
        validate_crawl(value, layer, "crawl")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("router") {
        validate_router(value, layer, "router")?;
    }
    if let Some(value) = map.get("dispatch") {
        validate_dispatch(value, layer, "dispatch")?;
    }
    Ok(())
}

/// Validate the "crawl" block.
fn validate_crawl(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let integers = [
        "max_pages",
        "max_depth",
        "seed_timeout_ms",
        "page_timeout_ms",
        "synthesis_max_chars",
        "max_page_chars",
        "max_links_per_page",
    ];
    let string_arrays = ["exclude_patterns", "priority_keywords"];
    let mut allowed = Vec::from(integers);
    allowed.extend(string_arrays);
    allowed.extend(["user_agent", "prioritize_links"]);
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for key in integers {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    for key in string_arrays {
        if let Some(value) = map.get(key) {
            validate_string_array(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("user_agent") {
        expect_string(value, layer, &join_path(path, "user_agent"))?;
    }
    if let Some(value) = map.get("prioritize_links") {
        expect_bool(value, layer, &join_path(path, "prioritize_links"))?;
    }
    Ok(())
}

/// Validate the "memory" block.
fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["path", "max_records", "retrieval"], layer, path)?;

    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("max_records")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "max_records"))?;
    }
    if let Some(value) = map.get("retrieval") {
        validate_retrieval(value, layer, &join_path(path, "retrieval"))?;
    }
    Ok(())
}

/// Validate the "memory.retrieval" block.
fn validate_retrieval(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = ["floor", "token_weight", "url_bonus", "limit"];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    for key in ["floor", "token_weight", "url_bonus"] {
        if let Some(value) = map.get(key) {
            expect_f64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("limit") {
        expect_u64(value, layer, &join_path(path, "limit"))?;
    }
    Ok(())
}

/// Validate the "router" block.
fn validate_router(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = [
        "answer_threshold",
        "busy_policy",
        "remember_replies",
        "history_messages",
        "history_chars",
    ];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    if let Some(value) = map.get("answer_threshold") {
        expect_f64(value, layer, &join_path(path, "answer_threshold"))?;
    }
    if let Some(value) = map.get("busy_policy") {
        validate_busy_policy(value, layer, &join_path(path, "busy_policy"))?;
    }
    if let Some(value) = map.get("remember_replies") {
        expect_bool(value, layer, &join_path(path, "remember_replies"))?;
    }
    for key in ["history_messages", "history_chars"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn validate_busy_policy(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Some(policy) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if matches!(policy, "queue" | "reject") {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "invalid busy policy"))
    }
}

/// Validate the "dispatch" block.
fn validate_dispatch(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["segment_limit", "parse_mode"], layer, path)?;

    if let Some(value) = map.get("segment_limit") {
        expect_u64(value, layer, &join_path(path, "segment_limit"))?;
    }
    if let Some(value) = map.get("parse_mode")
        && !value.is_null()
    {
        expect_string(value, layer, &join_path(path, "parse_mode"))?;
    }
    Ok(())
}

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

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(items) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    for (index, item) in items.iter().enumerate() {
        expect_string(item, layer, &format!("{path}[{index}]"))?;
    }
    Ok(())
}

fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
