use serde_json::{Map, Value};

use crate::data::schema::FieldSchema;

static NULL: Value = Value::Null;

/// Whether a value counts as "not filled in" for required checks.
///
/// Booleans and numbers are never empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Text shown in a single-line input for a value.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Read `cfg[key]`, or `null` when `cfg` is not an object or lacks the key.
pub fn get_key<'a>(cfg: &'a Value, key: &str) -> &'a Value {
    cfg.get(key).unwrap_or(&NULL)
}

/// Turn `cfg` into an object if it is anything else and return the map.
pub fn ensure_object(cfg: &mut Value) -> &mut Map<String, Value> {
    if !cfg.is_object() {
        *cfg = Value::Object(Map::new());
    }
    match cfg {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

pub fn set_key(cfg: &mut Value, key: &str, value: Value) {
    ensure_object(cfg).insert(key.to_string(), value);
}

/// Mutable array stored at `cfg[key]`, created empty when missing.
pub fn array_mut<'a>(cfg: &'a mut Value, key: &str) -> &'a mut Vec<Value> {
    let slot = ensure_object(cfg)
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(a) => a,
        _ => unreachable!("slot was just replaced by an array"),
    }
}

/// A module's subtree of the root config, `{}` when absent.
pub fn module_subtree(root: &Value, module: &str) -> Value {
    match root.get(module) {
        Some(v) if v.is_object() => v.clone(),
        _ => Value::Object(Map::new()),
    }
}

/// Copy of `cfg` without the keys of fields marked `exclude_on_save`.
pub fn strip_excluded(fields: &[FieldSchema], cfg: &Value) -> Value {
    let mut out = cfg.clone();
    if let Value::Object(map) = &mut out {
        for f in fields.iter().filter(|f| f.exclude_on_save) {
            map.remove(&f.key);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::FieldKind;
    use serde_json::json;

    #[test]
    fn test_emptiness() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("  ")));
        assert!(is_empty_value(&json!([])));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!("x")));
    }

    #[test]
    fn test_array_mut_replaces_non_arrays() {
        let mut cfg = json!({"list": "oops"});
        array_mut(&mut cfg, "list").push(json!(1));
        array_mut(&mut cfg, "other").push(json!(2));
        assert_eq!(cfg, json!({"list": [1], "other": [2]}));
    }

    #[test]
    fn test_strip_excluded() {
        let fields = vec![
            FieldSchema::new("a", "A", FieldKind::Text),
            FieldSchema::new("secret", "S", FieldKind::Password).exclude_on_save(),
        ];
        let cfg = json!({"a": 1, "secret": "x"});
        assert_eq!(strip_excluded(&fields, &cfg), json!({"a": 1}));
    }

    #[test]
    fn test_module_subtree_defaults_to_empty_object() {
        let root = json!({"general": {"x": 1}, "bad": 3});
        assert_eq!(module_subtree(&root, "general"), json!({"x": 1}));
        assert_eq!(module_subtree(&root, "bad"), json!({}));
        assert_eq!(module_subtree(&root, "missing"), json!({}));
    }
}
