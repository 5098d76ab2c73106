//! Field and module schema definitions.
//!
//! Schemas are immutable descriptions of a module's configurable values. They
//! are usually built in code by [`crate::data::catalog`] but can also be read
//! from JSON, where each field carries its kind in a `type` tag.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Errors raised while reading schemas or schema-bound values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("field `{key}` has unknown type `{tag}`")]
    UnknownFieldType { key: String, tag: String },

    #[error("field `{0}` declares a composite type but no nested fields")]
    MissingNestedFields(String),

    #[error("duplicate field key `{0}`")]
    DuplicateKey(String),

    #[error("invalid {format} value: `{input}`")]
    InvalidFormat { format: &'static str, input: String },
}

/// The closed set of field kinds a schema can declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Float,
    Password,
    TextArea,
    Dropdown,
    CheckBox,
    Json,
    Dir,
    DirList,
    DirListDragDrop,
    DirListOptions,
    Color,
    ColorList,
    Schedule,
    HolidaySchedule,
    Instances,
    InstanceDropdown,
    GdriveCustom,
    HolidaysCustom,
    UpgradinatorrCustom,
    LabelarrCustom,
}

impl FieldKind {
    pub const ALL: [FieldKind; 22] = [
        FieldKind::Text,
        FieldKind::Number,
        FieldKind::Float,
        FieldKind::Password,
        FieldKind::TextArea,
        FieldKind::Dropdown,
        FieldKind::CheckBox,
        FieldKind::Json,
        FieldKind::Dir,
        FieldKind::DirList,
        FieldKind::DirListDragDrop,
        FieldKind::DirListOptions,
        FieldKind::Color,
        FieldKind::ColorList,
        FieldKind::Schedule,
        FieldKind::HolidaySchedule,
        FieldKind::Instances,
        FieldKind::InstanceDropdown,
        FieldKind::GdriveCustom,
        FieldKind::HolidaysCustom,
        FieldKind::UpgradinatorrCustom,
        FieldKind::LabelarrCustom,
    ];

    /// Tag used in JSON schemas.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Float => "float",
            FieldKind::Password => "password",
            FieldKind::TextArea => "textarea",
            FieldKind::Dropdown => "dropdown",
            FieldKind::CheckBox => "check_box",
            FieldKind::Json => "json",
            FieldKind::Dir => "dir",
            FieldKind::DirList => "dir_list",
            FieldKind::DirListDragDrop => "dir_list_drag_drop",
            FieldKind::DirListOptions => "dir_list_options",
            FieldKind::Color => "color",
            FieldKind::ColorList => "color_list",
            FieldKind::Schedule => "schedule",
            FieldKind::HolidaySchedule => "holiday_schedule",
            FieldKind::Instances => "instances",
            FieldKind::InstanceDropdown => "instance_dropdown",
            FieldKind::GdriveCustom => "gdrive_custom",
            FieldKind::HolidaysCustom => "holidays_custom",
            FieldKind::UpgradinatorrCustom => "upgradinatorr_custom",
            FieldKind::LabelarrCustom => "labelarr_custom",
        }
    }

    /// Card-based editors over an array of entry objects.
    pub fn is_card_list(&self) -> bool {
        matches!(
            self,
            FieldKind::GdriveCustom
                | FieldKind::HolidaysCustom
                | FieldKind::UpgradinatorrCustom
                | FieldKind::LabelarrCustom
        )
    }

    /// Editors over an array of directory paths.
    pub fn is_dir_list(&self) -> bool {
        matches!(
            self,
            FieldKind::DirList | FieldKind::DirListDragDrop | FieldKind::DirListOptions
        )
    }

    /// Whether the kind edits one scalar value through a single input.
    pub fn has_scalar_input(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Number
                | FieldKind::Float
                | FieldKind::Password
                | FieldKind::TextArea
                | FieldKind::Dropdown
                | FieldKind::CheckBox
                | FieldKind::Json
                | FieldKind::Dir
                | FieldKind::Color
                | FieldKind::Schedule
                | FieldKind::HolidaySchedule
                | FieldKind::InstanceDropdown
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FieldKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == s)
            .ok_or_else(|| SchemaError::UnknownFieldType {
                key: String::new(),
                tag: s.to_string(),
            })
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(match tag {
            Some(tag) => tag.parse().unwrap_or_else(|_| {
                warn!("unknown field type `{tag}`, rendering as text");
                FieldKind::Text
            }),
            None => FieldKind::Text,
        })
    }
}

/// One configurable value within a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Unique within its schema array.
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Nested schema of the entry objects edited by card lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if_instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_types: Vec<String>,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub exclude_on_save: bool,
}

impl FieldSchema {
    pub fn new(key: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn placeholder(mut self, text: &str) -> Self {
        self.placeholder = Some(text.to_string());
        self
    }

    pub fn nested(mut self, fields: Vec<FieldSchema>) -> Self {
        self.fields = fields;
        self
    }

    pub fn show_if(mut self, instance_type: &str) -> Self {
        self.show_if_instance_type = Some(instance_type.to_string());
        self
    }

    pub fn instance_types(mut self, types: &[&str]) -> Self {
        self.instance_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn preview(mut self) -> Self {
        self.preview = true;
        self
    }

    pub fn exclude_on_save(mut self) -> Self {
        self.exclude_on_save = true;
        self
    }

    /// Whether this field's picker accepts Plex instances.
    pub fn supports_plex(&self) -> bool {
        self.instance_types.iter().any(|t| t == "plex")
    }
}

/// One configurable module and its fields, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldSchema>,
}

impl ModuleSchema {
    /// Look up a top-level field by key.
    pub fn field(&self, key: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Parse a module schema, rejecting unknown field types and malformed
    /// nesting instead of falling back to text inputs.
    pub fn from_json_strict(value: &Value) -> Result<Self, SchemaError> {
        if let Some(fields) = value.get("fields").and_then(Value::as_array) {
            check_tags(fields)?;
        }
        let schema: ModuleSchema =
            serde_json::from_value(value.clone()).map_err(|e| SchemaError::TypeMismatch {
                path: value
                    .get("key")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                expected: "module schema".to_string(),
                actual: e.to_string(),
            })?;
        check_fields(&schema.fields)?;
        Ok(schema)
    }
}

fn check_tags(fields: &[Value]) -> Result<(), SchemaError> {
    for f in fields {
        let key = f.get("key").and_then(Value::as_str).unwrap_or_default();
        match f.get("type").and_then(Value::as_str) {
            Some(tag) => {
                tag.parse::<FieldKind>()
                    .map_err(|_| SchemaError::UnknownFieldType {
                        key: key.to_string(),
                        tag: tag.to_string(),
                    })?;
            }
            None => {
                return Err(SchemaError::UnknownFieldType {
                    key: key.to_string(),
                    tag: String::new(),
                });
            }
        }
        if let Some(nested) = f.get("fields").and_then(Value::as_array) {
            check_tags(nested)?;
        }
    }
    Ok(())
}

/// Check key uniqueness and composite nesting, recursively.
pub fn check_fields(fields: &[FieldSchema]) -> Result<(), SchemaError> {
    let mut seen = std::collections::HashSet::new();
    for f in fields {
        if !seen.insert(f.key.as_str()) {
            return Err(SchemaError::DuplicateKey(f.key.clone()));
        }
        if f.kind.is_card_list() && f.fields.is_empty() {
            return Err(SchemaError::MissingNestedFields(f.key.clone()));
        }
        check_fields(&f.fields)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        let f: FieldSchema =
            serde_json::from_value(json!({"key": "x", "label": "X", "type": "sparkles"})).unwrap();
        assert_eq!(f.kind, FieldKind::Text);

        let f: FieldSchema = serde_json::from_value(json!({"key": "y"})).unwrap();
        assert_eq!(f.kind, FieldKind::Text);
    }

    #[test]
    fn test_strict_rejects_unknown_type() {
        let err = ModuleSchema::from_json_strict(&json!({
            "key": "m",
            "label": "M",
            "fields": [{"key": "a", "type": "text"}, {"key": "b", "type": "sparkles"}]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownFieldType {
                key: "b".into(),
                tag: "sparkles".into()
            }
        );
    }

    #[test]
    fn test_strict_requires_nested_fields_for_cards() {
        let err = ModuleSchema::from_json_strict(&json!({
            "key": "m",
            "label": "M",
            "fields": [{"key": "gdrive_list", "type": "gdrive_custom"}]
        }))
        .unwrap_err();
        assert_eq!(err, SchemaError::MissingNestedFields("gdrive_list".into()));
    }

    #[test]
    fn test_tags_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.tag().parse::<FieldKind>().unwrap(), kind);
        }
    }
}
