//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base; objects merge key by key, anything
/// else (including arrays) is replaced wholesale.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_arrays_replace() {
        let mut base = json!({
            "crawl": { "max_pages": 5, "exclude_patterns": ["/login"] },
            "router": { "busy_policy": "queue" }
        });
        let overlay = json!({
            "crawl": { "max_depth": 2, "exclude_patterns": ["/admin"] }
        });
        merge_json_values(&mut base, &overlay);
        assert_eq!(
            base,
            json!({
                "crawl": { "max_pages": 5, "max_depth": 2, "exclude_patterns": ["/admin"] },
                "router": { "busy_policy": "queue" }
            })
        );
    }
}
