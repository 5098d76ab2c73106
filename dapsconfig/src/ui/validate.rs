//! Required-field validation.
//!
//! [`validate`] reads values from the configuration tree and annotates the
//! rendered form. Every call first clears all markers, so running it twice in
//! a row yields the same keys and one message per offending field.

use serde_json::Value;

use crate::{
    data::{
        instances::{InstanceRef, InstanceSelection, instance_type_of},
        schema::{FieldKind, FieldSchema},
        value::{get_key, is_empty_value, value_to_text},
    },
    ui::{
        element::{Form, Widget},
        render::is_visible,
    },
};

#[derive(Clone, Copy)]
pub struct ValidateOptions<'a> {
    pub root: &'a Value,
    /// Inside a modal, fields without a rendered input are tolerated.
    pub is_modal: bool,
}

/// Keys of the required fields in `schema` that are not satisfied by `scope`.
///
/// Side effect: `form` gets an error message on each offending row (and a
/// per-instance message for every checked Plex instance without libraries);
/// `form.scroll_to` points at the first offending row.
pub fn validate(
    schema: &[FieldSchema],
    scope: &Value,
    form: &mut Form,
    opts: ValidateOptions<'_>,
) -> Vec<String> {
    form.clear_errors();
    let mut invalid: Vec<String> = Vec::new();

    for field in schema {
        if field.exclude_on_save || !is_visible(field, scope, opts.root) {
            continue;
        }
        let value = get_key(scope, &field.key);

        let failure = if field.kind == FieldKind::Instances {
            check_instances(field, value, form, opts.root)
        } else if field.required {
            check_required(field, value, form, opts.is_modal)
        } else {
            None
        };

        if let Some(message) = failure
            && !invalid.contains(&field.key)
        {
            form.set_error(&field.key, message);
            invalid.push(field.key.clone());
        }
    }

    form.scroll_to = invalid.first().cloned();
    if !invalid.is_empty() {
        debug!("validation failed for {invalid:?}");
    }
    invalid
}

fn check_required(field: &FieldSchema, value: &Value, form: &Form, is_modal: bool) -> Option<String> {
    let label = if field.label.is_empty() {
        &field.key
    } else {
        &field.label
    };
    let empty = match field.kind {
        FieldKind::ColorList => !value
            .as_array()
            .is_some_and(|a| a.iter().any(|c| !value_to_text(c).trim().is_empty())),
        kind if kind.is_dir_list() => !dir_paths(value).iter().any(|p| !p.trim().is_empty()),
        kind if kind.has_scalar_input() => is_empty_value(value),
        _ => {
            // No single bound input: the field has to be on screen to be
            // satisfiable, except in modals where card summaries stand in.
            if !form.has_input(&field.key) {
                if is_modal {
                    return None;
                }
                return Some(format!("{label} is required"));
            }
            is_empty_value(value)
        }
    };
    empty.then(|| match field.kind {
        FieldKind::ColorList => format!("{label}: add at least one color"),
        kind if kind.is_dir_list() => format!("{label}: add at least one directory"),
        _ => format!("{label} is required"),
    })
}

fn dir_paths(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => obj.get("path").map(value_to_text).unwrap_or_default(),
                other => value_to_text(other),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn check_instances(
    field: &FieldSchema,
    value: &Value,
    form: &mut Form,
    root: &Value,
) -> Option<String> {
    let selection = InstanceSelection::from_value(value);
    let in_scope: Vec<&InstanceRef> = selection
        .0
        .iter()
        .filter(|r| {
            instance_type_of(root, r.name()).is_some_and(|t| field.instance_types.contains(&t))
        })
        .collect();

    if field.required && in_scope.is_empty() {
        return Some(format!(
            "Select at least one {} instance",
            field.instance_types.join("/")
        ));
    }

    if !field.supports_plex() {
        return None;
    }

    let missing: Vec<&str> = in_scope
        .iter()
        .filter_map(|r| match r {
            InstanceRef::Plex {
                name,
                library_names,
                ..
            } if library_names.is_empty() => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if missing.is_empty() {
        return None;
    }

    if let Some(row) = form.row_mut(&field.key)
        && let Widget::Instances(picker) = &mut row.widget
    {
        for name in &missing {
            picker.library_errors.insert(
                name.to_string(),
                format!("Select at least one library for {name}"),
            );
        }
    }
    Some(format!("Choose libraries for: {}", missing.join(", ")))
}
