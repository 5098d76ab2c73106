//! Instance lookups against the root configuration and the mixed
//! selection list stored by `instances` fields.
//!
//! Instances live under `root.instances.<type>`. A bucket is either an object
//! keyed by instance name or an array of entries carrying a `name` key.
//!
//! A selection list mixes two shapes:
//!
//! ```json
//! ["radarr_hd", {"plex_main": {"library_names": ["Movies"], "add_posters": true}}]
//! ```

use serde_json::{Map, Value, json};

use crate::data::schema::SchemaError;

pub const INSTANCE_TYPES: &[&str] = &["radarr", "sonarr", "lidarr", "plex"];

fn bucket_names(bucket: &Value) -> Vec<String> {
    match bucket {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|e| e.get("name").and_then(Value::as_str))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Names of the instances configured under one type bucket, in order.
pub fn instances_of_type(root: &Value, instance_type: &str) -> Vec<String> {
    root.get("instances")
        .and_then(|i| i.get(instance_type))
        .map(bucket_names)
        .unwrap_or_default()
}

/// `(type, names)` groups for the requested types, skipping empty buckets.
pub fn instance_groups(root: &Value, types: &[String]) -> Vec<(String, Vec<String>)> {
    types
        .iter()
        .map(|t| (t.clone(), instances_of_type(root, t)))
        .filter(|(_, names)| !names.is_empty())
        .collect()
}

/// The type bucket that holds `name`.
pub fn instance_type_of(root: &Value, name: &str) -> Option<String> {
    let instances = root.get("instances")?.as_object()?;
    instances
        .iter()
        .find(|(_, bucket)| bucket_names(bucket).iter().any(|n| n == name))
        .map(|(t, _)| t.clone())
}

/// One element of an `instances` selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceRef {
    /// Radarr/Sonarr/Lidarr instance selected by name.
    Name(String),
    /// Plex instance with the libraries it applies to.
    Plex {
        name: String,
        library_names: Vec<String>,
        add_posters: Option<bool>,
    },
}

impl InstanceRef {
    pub fn name(&self) -> &str {
        match self {
            InstanceRef::Name(n) => n,
            InstanceRef::Plex { name, .. } => name,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) => Ok(InstanceRef::Name(s.clone())),
            Value::Object(map) if map.len() == 1 => {
                let (name, body) = map.iter().next().ok_or_else(|| mismatch(value))?;
                let library_names = body
                    .get("library_names")
                    .and_then(Value::as_array)
                    .map(|libs| {
                        libs.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(InstanceRef::Plex {
                    name: name.clone(),
                    library_names,
                    add_posters: body.get("add_posters").and_then(Value::as_bool),
                })
            }
            _ => Err(mismatch(value)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            InstanceRef::Name(n) => Value::String(n.clone()),
            InstanceRef::Plex {
                name,
                library_names,
                add_posters,
            } => {
                let mut body = Map::new();
                body.insert("library_names".into(), json!(library_names));
                if let Some(add) = add_posters {
                    body.insert("add_posters".into(), Value::Bool(*add));
                }
                let mut outer = Map::new();
                outer.insert(name.clone(), Value::Object(body));
                Value::Object(outer)
            }
        }
    }
}

fn mismatch(value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        path: "instances".to_string(),
        expected: "instance name or {name: {library_names}}".to_string(),
        actual: value.to_string(),
    }
}

/// Ordered selection of instances, as stored by an `instances` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSelection(pub Vec<InstanceRef>);

impl InstanceSelection {
    /// Read a selection list. Malformed elements are dropped with a warning.
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| {
                        InstanceRef::from_value(v)
                            .inspect_err(|e| warn!("dropping instance selection entry: {e}"))
                            .ok()
                    })
                    .collect()
            })
            .unwrap_or_default();
        InstanceSelection(items)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(InstanceRef::to_value).collect())
    }

    pub fn get(&self, name: &str) -> Option<&InstanceRef> {
        self.0.iter().find(|r| r.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Check or uncheck an instance. Plex instances start with no libraries.
    pub fn toggle(&mut self, name: &str, is_plex: bool) {
        if let Some(pos) = self.0.iter().position(|r| r.name() == name) {
            self.0.remove(pos);
        } else if is_plex {
            self.0.push(InstanceRef::Plex {
                name: name.to_string(),
                library_names: Vec::new(),
                add_posters: None,
            });
        } else {
            self.0.push(InstanceRef::Name(name.to_string()));
        }
    }

    /// Add or remove one library of a checked Plex instance.
    ///
    /// Returns `false` when the instance is not checked as Plex.
    pub fn toggle_library(&mut self, instance: &str, library: &str) -> bool {
        for r in &mut self.0 {
            if let InstanceRef::Plex {
                name,
                library_names,
                ..
            } = r
                && name == instance
            {
                if let Some(pos) = library_names.iter().position(|l| l == library) {
                    library_names.remove(pos);
                } else {
                    library_names.push(library.to_string());
                }
                return true;
            }
        }
        false
    }

    pub fn toggle_add_posters(&mut self, instance: &str) -> bool {
        for r in &mut self.0 {
            if let InstanceRef::Plex {
                name, add_posters, ..
            } = r
                && name == instance
            {
                *add_posters = Some(!add_posters.unwrap_or(false));
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Value {
        json!({
            "instances": {
                "radarr": {"radarr_hd": {"url": "u"}, "radarr_4k": {"url": "u"}},
                "sonarr": [{"name": "sonarr_main"}],
                "plex": {"plex_main": {}}
            }
        })
    }

    #[test]
    fn test_instance_type_lookup() {
        let root = root();
        assert_eq!(instance_type_of(&root, "radarr_4k").as_deref(), Some("radarr"));
        assert_eq!(instance_type_of(&root, "sonarr_main").as_deref(), Some("sonarr"));
        assert_eq!(instance_type_of(&root, "nope"), None);
        assert_eq!(
            instances_of_type(&root, "radarr"),
            vec!["radarr_4k".to_string(), "radarr_hd".to_string()]
        );
    }

    #[test]
    fn test_mixed_selection_round_trip() {
        let raw = json!(["radarr_hd", {"plex_main": {"library_names": ["Movies"], "add_posters": true}}]);
        let sel = InstanceSelection::from_value(&raw);
        assert_eq!(sel.0.len(), 2);
        assert_eq!(sel.to_value(), raw);
    }

    #[test]
    fn test_toggle_plex_and_libraries() {
        let mut sel = InstanceSelection::default();
        sel.toggle("plex_main", true);
        assert!(sel.toggle_library("plex_main", "Movies"));
        assert!(sel.toggle_library("plex_main", "Shows"));
        assert!(sel.toggle_library("plex_main", "Movies"));
        assert_eq!(sel.to_value(), json!([{"plex_main": {"library_names": ["Shows"]}}]));
        sel.toggle("plex_main", true);
        assert!(sel.0.is_empty());
        assert!(!sel.toggle_library("plex_main", "Movies"));
    }
}
