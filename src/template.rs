//! Dotted-path template projection.
//!
//! Templates map output paths to value specs and are used in two directions:
//! building action-call arguments from request args (`input` templates) and
//! building response candidates from action results (`output` templates).
//!
//! A value spec is one of:
//! - `"_"`: the entire source object
//! - `"_.a.b"`: the value at dotted path `a.b` inside the source (missing
//!   paths project as `null`, never an error)
//! - anything else: a literal
//!
//! Output paths are dotted too and written with deep-set semantics
//! (intermediate objects auto-created). Keys project independently: no key
//! ever observes another key's output, so key order cannot change the result.

use serde_json::{Map, Value};

/// A projection template: output dotted path → value spec.
pub type Template = Map<String, Value>;

const WHOLE_SOURCE: &str = "_";
const SOURCE_PATH_PREFIX: &str = "_.";

/// Walk `source` along a dotted path. Only objects are traversed.
pub fn get_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Deep-set `value` at a dotted path, creating intermediate objects.
/// Non-object intermediates are replaced.
pub fn set_path(target: &mut Value, path: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let mut current = target;
    let mut keys = path.split('.').peekable();
    while let Some(key) = keys.next() {
        let Some(map) = current.as_object_mut() else {
            return;
        };
        if keys.peek().is_none() {
            map.insert(key.to_string(), value);
            return;
        }
        let slot = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot;
    }
}

/// Project `source` through `template`, producing a fresh object.
pub fn project(template: &Template, source: &Value) -> Value {
    let mut next = Value::Object(Map::new());

    for (out_path, spec) in template {
        let value = match spec {
            Value::String(s) if s == WHOLE_SOURCE => source.clone(),
            Value::String(s) if s.starts_with(SOURCE_PATH_PREFIX) => {
                let path = &s[SOURCE_PATH_PREFIX.len()..];
                get_path(source, path).cloned().unwrap_or(Value::Null)
            }
            literal => literal.clone(),
        };
        set_path(&mut next, out_path, value);
    }

    next
}

/// Deep merge where `primary` wins on every conflict. Objects merge
/// recursively; any other collision keeps the primary value.
pub fn merge_left(primary: Value, secondary: Value) -> Value {
    match (primary, secondary) {
        (Value::Object(first), Value::Object(mut second)) => {
            let mut merged = Map::new();
            for (key, left) in first {
                let value = match second.remove(&key) {
                    Some(right) => merge_left(left, right),
                    None => left,
                };
                merged.insert(key, value);
            }
            for (key, right) in second {
                merged.insert(key, right);
            }
            Value::Object(merged)
        }
        (primary, _) => primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(value: Value) -> Template {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_project_whole_source() {
        let src = json!({ "a": { "b": 5 } });
        let out = project(&template(json!({ "out": "_" })), &src);
        assert_eq!(out, json!({ "out": { "a": { "b": 5 } } }));
    }

    #[test]
    fn test_project_source_path() {
        let src = json!({ "a": { "b": 5 } });
        let out = project(&template(json!({ "out": "_.a.b" })), &src);
        assert_eq!(out, json!({ "out": 5 }));
    }

    #[test]
    fn test_project_missing_path_is_null() {
        let src = json!({ "a": 1 });
        let out = project(&template(json!({ "out": "_.x.y" })), &src);
        assert_eq!(out, json!({ "out": null }));
    }

    #[test]
    fn test_project_literals_and_deep_set() {
        let src = json!({});
        let out = project(
            &template(json!({ "meta.kind": "pet", "meta.count": 3 })),
            &src,
        );
        assert_eq!(out, json!({ "meta": { "kind": "pet", "count": 3 } }));
    }

    #[test]
    fn test_project_keys_are_independent() {
        // One key writing into `meta` must not be readable by another spec.
        let src = json!({ "x": 1 });
        let out = project(
            &template(json!({ "meta.x": "_.x", "copy": "_.meta.x" })),
            &src,
        );
        assert_eq!(out, json!({ "meta": { "x": 1 }, "copy": null }));
    }

    #[test]
    fn test_merge_left_primary_wins() {
        let merged = merge_left(
            json!({ "a": 1, "nest": { "x": "keep" } }),
            json!({ "a": 2, "b": 3, "nest": { "x": "drop", "y": 4 } }),
        );
        assert_eq!(
            merged,
            json!({ "a": 1, "b": 3, "nest": { "x": "keep", "y": 4 } })
        );
    }
}
