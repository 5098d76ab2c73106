//! User edits as messages, and the reducer that writes them into the
//! configuration tree.
//!
//! Every edit lands in the tree immediately; nothing waits for a save button.
//! Validation and saving always read the tree, never a pending edit.

use std::fmt;

use serde_json::{Number, Value, json};

use crate::{
    codec::{HolidayRange, Schedule},
    data::{
        instances::{InstanceSelection, instance_groups, instance_type_of},
        schema::{FieldKind, FieldSchema, SchemaError},
        value::{array_mut, get_key, set_key},
    },
    error::{FormError, Result},
};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldMsg {
    /// Replace the text of a single-input field.
    SetText(String),
    /// Pick option `n` of a dropdown.
    Select(usize),
    Toggle,
    ListSet { index: usize, value: String },
    ListPush(String),
    ListRemove(usize),
    ListMove { from: usize, to: usize },
    ListSetOption { index: usize, option: String },
    SetSchedule(Schedule),
    SetHolidayRange(HolidayRange),
    ToggleInstance(String),
    ToggleLibrary { instance: String, library: String },
    ToggleAddPosters(String),
}

impl fmt::Display for FieldMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldMsg::SetText(_) => "set-text",
            FieldMsg::Select(_) => "select",
            FieldMsg::Toggle => "toggle",
            FieldMsg::ListSet { .. } => "list-set",
            FieldMsg::ListPush(_) => "list-push",
            FieldMsg::ListRemove(_) => "list-remove",
            FieldMsg::ListMove { .. } => "list-move",
            FieldMsg::ListSetOption { .. } => "list-set-option",
            FieldMsg::SetSchedule(_) => "set-schedule",
            FieldMsg::SetHolidayRange(_) => "set-holiday-range",
            FieldMsg::ToggleInstance(_) => "toggle-instance",
            FieldMsg::ToggleLibrary { .. } => "toggle-library",
            FieldMsg::ToggleAddPosters(_) => "toggle-add-posters",
        };
        f.write_str(name)
    }
}

fn unsupported(field: &FieldSchema, msg: &FieldMsg) -> FormError {
    FormError::UnsupportedEdit {
        key: field.key.clone(),
        msg: msg.to_string(),
    }
}

/// Apply one edit to `scope[field.key]`.
///
/// `scope` is the module subtree or modal entry the field belongs to; `root`
/// resolves instance names to their types.
pub fn apply_msg(field: &FieldSchema, msg: FieldMsg, scope: &mut Value, root: &Value) -> Result<()> {
    let key = field.key.as_str();
    match (field.kind, msg) {
        (
            FieldKind::Text
            | FieldKind::Password
            | FieldKind::TextArea
            | FieldKind::Dir
            | FieldKind::Color
            | FieldKind::Dropdown,
            FieldMsg::SetText(s),
        ) => set_key(scope, key, Value::String(s)),
        (FieldKind::Number, FieldMsg::SetText(s)) => {
            let v = match s.trim() {
                "" => Value::Null,
                t => t
                    .parse::<i64>()
                    .map(|n| Value::Number(n.into()))
                    .unwrap_or(Value::String(s)),
            };
            set_key(scope, key, v)
        }
        (FieldKind::Float, FieldMsg::SetText(s)) => {
            let v = match s.trim() {
                "" => Value::Null,
                t => t
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::String(s)),
            };
            set_key(scope, key, v)
        }
        (FieldKind::Json, FieldMsg::SetText(s)) => {
            let v = if s.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&s).unwrap_or(Value::String(s))
            };
            set_key(scope, key, v)
        }
        (FieldKind::Dropdown, FieldMsg::Select(i)) => {
            let opt = field
                .options
                .get(i)
                .ok_or_else(|| unsupported(field, &FieldMsg::Select(i)))?;
            set_key(scope, key, Value::String(opt.clone()))
        }
        (FieldKind::InstanceDropdown, FieldMsg::Select(i)) => {
            let name = instance_groups(root, &field.instance_types)
                .into_iter()
                .flat_map(|(_, names)| names)
                .nth(i)
                .ok_or_else(|| unsupported(field, &FieldMsg::Select(i)))?;
            set_key(scope, key, Value::String(name))
        }
        (FieldKind::InstanceDropdown, FieldMsg::SetText(s)) => {
            set_key(scope, key, Value::String(s))
        }
        (FieldKind::CheckBox, FieldMsg::Toggle) => {
            let current = get_key(scope, key).as_bool().unwrap_or(false);
            set_key(scope, key, Value::Bool(!current))
        }
        (FieldKind::Schedule, FieldMsg::SetSchedule(s)) => {
            set_key(scope, key, Value::String(s.to_string()))
        }
        (FieldKind::Schedule, FieldMsg::SetText(s)) => {
            // Re-serialise so the stored text is always canonical.
            let text = if s.trim().is_empty() {
                String::new()
            } else {
                Schedule::try_parse(&s)
                    .ok_or(SchemaError::InvalidFormat {
                        format: "schedule",
                        input: s,
                    })?
                    .to_string()
            };
            set_key(scope, key, Value::String(text))
        }
        (FieldKind::HolidaySchedule, FieldMsg::SetHolidayRange(r)) => {
            set_key(scope, key, Value::String(r.to_string()))
        }
        (FieldKind::HolidaySchedule, FieldMsg::SetText(s)) => {
            let r: HolidayRange = s.parse()?;
            set_key(scope, key, Value::String(r.to_string()))
        }
        (kind, msg) if kind.is_dir_list() || kind == FieldKind::ColorList => {
            apply_list(field, msg, scope)?
        }
        (FieldKind::Instances, msg) => apply_instances(field, msg, scope, root)?,
        (_, msg) => return Err(unsupported(field, &msg)),
    }
    Ok(())
}

fn new_list_item(field: &FieldSchema, value: String) -> Value {
    if field.kind == FieldKind::DirListOptions {
        json!({"path": value, "option": field.options.first()})
    } else {
        Value::String(value)
    }
}

fn apply_list(field: &FieldSchema, msg: FieldMsg, scope: &mut Value) -> Result<()> {
    let with_options = field.kind == FieldKind::DirListOptions;
    let list = array_mut(scope, &field.key);
    match msg {
        FieldMsg::ListPush(v) => list.push(new_list_item(field, v)),
        FieldMsg::ListSet { index, value } if index < list.len() => {
            if with_options && list[index].is_object() {
                list[index]["path"] = Value::String(value);
            } else {
                list[index] = new_list_item(field, value);
            }
        }
        FieldMsg::ListRemove(index) if index < list.len() => {
            list.remove(index);
        }
        FieldMsg::ListMove { from, to } if from < list.len() && to < list.len() => {
            let item = list.remove(from);
            list.insert(to, item);
        }
        FieldMsg::ListSetOption { index, option } if with_options && index < list.len() => {
            if !list[index].is_object() {
                let path = list[index].clone();
                list[index] = json!({"path": path});
            }
            list[index]["option"] = Value::String(option);
        }
        other => return Err(unsupported(field, &other)),
    }
    Ok(())
}

fn apply_instances(field: &FieldSchema, msg: FieldMsg, scope: &mut Value, root: &Value) -> Result<()> {
    let mut selection = InstanceSelection::from_value(get_key(scope, &field.key));
    match msg {
        FieldMsg::ToggleInstance(name) => {
            let is_plex = instance_type_of(root, &name).is_some_and(|t| t == "plex");
            selection.toggle(&name, is_plex);
        }
        FieldMsg::ToggleLibrary { instance, library } => {
            if !selection.toggle_library(&instance, &library) {
                return Err(unsupported(field, &FieldMsg::ToggleLibrary { instance, library }));
            }
        }
        FieldMsg::ToggleAddPosters(instance) => {
            if !selection.toggle_add_posters(&instance) {
                return Err(unsupported(field, &FieldMsg::ToggleAddPosters(instance)));
            }
        }
        other => return Err(unsupported(field, &other)),
    }
    set_key(scope, &field.key, selection.to_value());
    Ok(())
}
