//! Card editors for list-of-object fields.
//!
//! Each card list stores an array of entries under its key. Opening a card
//! (or "add") pushes a dialog scoped to one entry; Save writes it back in
//! place or appends it, Delete splices it out. Nothing else in the tree is
//! touched.

use serde_json::{Value, json};

use crate::{
    data::{
        schema::FieldSchema,
        value::{array_mut, get_key},
    },
    error::{FormError, Result},
    ui::{
        modal::{ButtonHandler, FooterButton, ModalHandle, ModalSpec, ModalStack},
        render::LibraryCache,
    },
};

/// Write `entry` to `target[key][index]`, or append it when `index` is
/// `None` or past the end.
pub fn commit_entry(target: &mut Value, key: &str, index: Option<usize>, entry: Value) {
    let list = array_mut(target, key);
    match index {
        Some(i) if i < list.len() => list[i] = entry,
        _ => list.push(entry),
    }
}

/// Remove `target[key][index]` if present.
pub fn remove_entry(target: &mut Value, key: &str, index: usize) -> Option<Value> {
    let list = array_mut(target, key);
    (index < list.len()).then(|| list.remove(index))
}

/// Default Save handler: commit the entry to the parent list and close.
pub fn save_handler(key: &str, index: Option<usize>) -> ButtonHandler {
    let key = key.to_string();
    Box::new(move |ctx| {
        commit_entry(ctx.module_config, &key, index, ctx.entry.clone());
        ctx.close_modal();
    })
}

/// Open the dialog for entry `index` of `field` (or a new entry).
///
/// `scope` holds the list. `on_save` replaces the default Save handler, e.g.
/// to run a connectivity test before committing.
pub fn open_card(
    stack: &mut ModalStack,
    field: &FieldSchema,
    scope: &Value,
    index: Option<usize>,
    root: &Value,
    libraries: &LibraryCache,
    on_save: Option<ButtonHandler>,
) -> Result<ModalHandle> {
    if !field.kind.is_card_list() || field.fields.is_empty() {
        return Err(FormError::render(&field.key, "not a card list"));
    }
    let entry = match index {
        Some(i) => get_key(scope, &field.key)
            .get(i)
            .cloned()
            .ok_or_else(|| FormError::render(&field.key, format!("no entry {i}")))?,
        None => json!({}),
    };

    let save = FooterButton::new("save", "Save")
        .with_handler(on_save.unwrap_or_else(|| save_handler(&field.key, index)));
    let mut buttons = vec![save];
    if let Some(i) = index {
        let key = field.key.clone();
        buttons.push(FooterButton::new("delete", "Delete").on_press(move |ctx| {
            remove_entry(ctx.module_config, &key, i);
            ctx.close_modal();
        }));
    }
    buttons.push(FooterButton::new("cancel", "Cancel"));

    let title = match index {
        Some(_) => format!("Edit {}", field.label),
        None => format!("Add {}", field.label),
    };
    Ok(stack.open(
        ModalSpec {
            title,
            schema: field.fields.clone(),
            entry,
            buttons,
        },
        root,
        libraries,
    ))
}
