//! Field renderer: schema + value -> row.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    codec::{HolidayRange, Schedule},
    data::{
        instances::{InstanceRef, InstanceSelection, instance_groups, instance_type_of},
        schema::{FieldKind, FieldSchema},
        value::{get_key, value_to_text},
    },
    error::{FormError, Result},
    ui::element::{
        Card, CardList, DirEntry, Form, InstanceChoice, InstanceGroup, InstancePicker, PlexChoice,
        Row, Widget,
    },
};

/// Fetched Plex library names, keyed by instance.
pub type LibraryCache = HashMap<String, Vec<String>>;

/// What a builder may look at besides its own value.
#[derive(Clone, Copy)]
pub struct RenderCtx<'a> {
    /// Object the field's value lives in: a module subtree or a modal entry.
    pub module: &'a Value,
    /// Full configuration, for instance lookups.
    pub root: &'a Value,
    pub libraries: &'a LibraryCache,
}

impl<'a> RenderCtx<'a> {
    pub fn new(module: &'a Value, root: &'a Value, libraries: &'a LibraryCache) -> Self {
        RenderCtx {
            module,
            root,
            libraries,
        }
    }
}

/// Whether a field applies to the instance currently selected in `scope`.
///
/// Fields without `show_if_instance_type` always apply.
pub fn is_visible(field: &FieldSchema, scope: &Value, root: &Value) -> bool {
    let Some(wanted) = &field.show_if_instance_type else {
        return true;
    };
    scope
        .get("instance")
        .and_then(Value::as_str)
        .and_then(|name| instance_type_of(root, name))
        .is_some_and(|t| &t == wanted)
}

/// Render every field of `fields` against `ctx.module`.
///
/// A field whose builder fails is logged and left out.
pub fn render_form(fields: &[FieldSchema], ctx: &RenderCtx<'_>) -> Form {
    let rows = fields
        .iter()
        .filter_map(|f| match render_field(f, get_key(ctx.module, &f.key), ctx) {
            Ok(row) => Some(row),
            Err(e) => {
                error!("skipping field `{}`: {e}", f.key);
                None
            }
        })
        .collect();
    Form {
        rows,
        scroll_to: None,
    }
}

/// Render one field.
pub fn render_field(field: &FieldSchema, value: &Value, ctx: &RenderCtx<'_>) -> Result<Row> {
    let widget = match field.kind {
        FieldKind::Text => text(field, value, false, false),
        FieldKind::Password => text(field, value, true, false),
        FieldKind::TextArea => text(field, value, false, true),
        FieldKind::Number => Widget::Number {
            value: value_to_text(value),
            float: false,
        },
        FieldKind::Float => Widget::Number {
            value: value_to_text(value),
            float: true,
        },
        FieldKind::Dropdown => dropdown(field.options.clone(), value),
        FieldKind::InstanceDropdown => {
            let options = instance_groups(ctx.root, &field.instance_types)
                .into_iter()
                .flat_map(|(_, names)| names)
                .collect();
            dropdown(options, value)
        }
        FieldKind::CheckBox => Widget::Checkbox {
            checked: value.as_bool().unwrap_or(false),
        },
        FieldKind::Json => json(value),
        FieldKind::Dir => Widget::Directory {
            path: value_to_text(value),
        },
        FieldKind::DirList | FieldKind::DirListDragDrop | FieldKind::DirListOptions => {
            dir_list(field, value)
        }
        FieldKind::Color => Widget::Color {
            value: value_to_text(value),
        },
        FieldKind::ColorList => Widget::ColorList {
            colors: string_list(value),
            preview: field.preview,
        },
        FieldKind::Schedule => {
            let text = value_to_text(value);
            Widget::Schedule {
                schedule: Schedule::parse(&text),
                text,
            }
        }
        FieldKind::HolidaySchedule => {
            let text = value_to_text(value);
            Widget::HolidayRange {
                range: text.parse::<HolidayRange>().ok(),
                text,
            }
        }
        FieldKind::Instances => Widget::Instances(instances(field, value, ctx)),
        FieldKind::GdriveCustom
        | FieldKind::HolidaysCustom
        | FieldKind::UpgradinatorrCustom
        | FieldKind::LabelarrCustom => Widget::Cards(cards(field, value)?),
    };

    Ok(Row {
        key: field.key.clone(),
        label: if field.label.is_empty() {
            field.key.clone()
        } else {
            field.label.clone()
        },
        kind: field.kind,
        required: field.required,
        widget,
        help: field.description.clone(),
        error: None,
        visible: is_visible(field, ctx.module, ctx.root),
    })
}

fn text(field: &FieldSchema, value: &Value, masked: bool, multiline: bool) -> Widget {
    let value = match value {
        Value::Array(items) if multiline => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => value_to_text(other),
    };
    Widget::Text {
        value,
        placeholder: field.placeholder.clone(),
        masked,
        multiline,
    }
}

fn dropdown(options: Vec<String>, value: &Value) -> Widget {
    let current = value_to_text(value);
    let selected = options.iter().position(|o| *o == current);
    Widget::Dropdown { options, selected }
}

fn json(value: &Value) -> Widget {
    match value {
        Value::Null => Widget::Json {
            text: String::new(),
            parse_error: None,
        },
        // Strings hold text the user typed that did not parse yet.
        Value::String(s) => Widget::Json {
            text: s.clone(),
            parse_error: serde_json::from_str::<Value>(s)
                .err()
                .map(|e| e.to_string()),
        },
        other => Widget::Json {
            text: other.to_string(),
            parse_error: None,
        },
    }
}

pub(crate) fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_to_text).collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn dir_list(field: &FieldSchema, value: &Value) -> Widget {
    let with_options = field.kind == FieldKind::DirListOptions;
    let entries = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => DirEntry {
                    path: obj.get("path").map(value_to_text).unwrap_or_default(),
                    option: obj.get("option").map(value_to_text),
                },
                other => DirEntry {
                    path: value_to_text(other),
                    option: with_options.then(|| field.options.first().cloned()).flatten(),
                },
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![DirEntry {
            path: s.clone(),
            option: None,
        }],
        _ => Vec::new(),
    };
    Widget::DirectoryList {
        entries,
        reorderable: field.kind == FieldKind::DirListDragDrop,
        options: if with_options {
            field.options.clone()
        } else {
            Vec::new()
        },
    }
}

fn instances(field: &FieldSchema, value: &Value, ctx: &RenderCtx<'_>) -> InstancePicker {
    let selection = InstanceSelection::from_value(value);
    let groups = instance_groups(ctx.root, &field.instance_types)
        .into_iter()
        .map(|(instance_type, names)| {
            let is_plex = instance_type == "plex";
            let choices = names
                .into_iter()
                .map(|name| {
                    let selected = selection.get(&name);
                    let plex = is_plex.then(|| plex_choice(&name, selected, ctx));
                    InstanceChoice {
                        checked: selected.is_some(),
                        name,
                        plex,
                    }
                })
                .collect();
            InstanceGroup {
                instance_type,
                choices,
            }
        })
        .collect();
    InstancePicker {
        groups,
        library_errors: Default::default(),
    }
}

fn plex_choice(name: &str, selected: Option<&InstanceRef>, ctx: &RenderCtx<'_>) -> PlexChoice {
    let (chosen, add_posters) = match selected {
        Some(InstanceRef::Plex {
            library_names,
            add_posters,
            ..
        }) => (library_names.clone(), add_posters.unwrap_or(false)),
        _ => (Vec::new(), false),
    };
    let fetched = ctx.libraries.get(name);
    // Selected libraries stay listed even before (or without) a live fetch.
    let mut names: Vec<String> = fetched.cloned().unwrap_or_default();
    for lib in &chosen {
        if !names.contains(lib) {
            names.push(lib.clone());
        }
    }
    PlexChoice {
        libraries: names
            .into_iter()
            .map(|l| {
                let on = chosen.contains(&l);
                (l, on)
            })
            .collect(),
        add_posters,
        loaded: fetched.is_some(),
    }
}

fn field_text(entry: &Value, key: &str) -> String {
    value_to_text(get_key(entry, key))
}

fn cards(field: &FieldSchema, value: &Value) -> Result<CardList> {
    if field.fields.is_empty() {
        return Err(FormError::render(&field.key, "composite field has no nested fields"));
    }
    let entries: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Null => &[],
        other => {
            warn!("`{}` should hold a list, found {other}", field.key);
            &[]
        }
    };
    let cards = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| card(field.kind, index, entry))
        .collect();
    Ok(CardList {
        cards,
        add_label: format!("Add {}", field.label),
    })
}

fn card(kind: FieldKind, index: usize, entry: &Value) -> Card {
    let mut card = Card {
        index,
        ..Default::default()
    };
    match kind {
        FieldKind::HolidaysCustom => {
            card.title = field_text(entry, "name");
            card.subtitle = field_text(entry, "schedule");
            card.swatches = string_list(get_key(entry, "color"));
        }
        FieldKind::UpgradinatorrCustom => {
            card.title = field_text(entry, "instance");
            card.subtitle = format!(
                "count {} · tag {}",
                field_text(entry, "count"),
                field_text(entry, "tag_name")
            );
        }
        FieldKind::LabelarrCustom => {
            card.title = field_text(entry, "app_instance");
            let plex = InstanceSelection::from_value(get_key(entry, "plex_instances"));
            let targets: Vec<String> = plex
                .0
                .iter()
                .map(|r| match r {
                    InstanceRef::Plex {
                        name,
                        library_names,
                        ..
                    } => format!("{name} ({})", library_names.join(", ")),
                    InstanceRef::Name(n) => n.clone(),
                })
                .collect();
            card.subtitle = format!("{} → {}", field_text(entry, "labels"), targets.join("; "));
        }
        _ => {
            card.title = field_text(entry, "name");
            card.subtitle = ["location", "url", "id"]
                .iter()
                .map(|k| field_text(entry, k))
                .find(|s| !s.is_empty())
                .unwrap_or_default();
        }
    }
    if card.title.is_empty() {
        card.title = format!("#{}", index + 1);
    }
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "instances": {
                "radarr": {"radarr_hd": {}},
                "sonarr": {"sonarr_main": {}},
                "plex": {"plex_main": {}}
            },
            "border_replacerr": {
                "border_colors": ["#FF0000"],
                "holidays": [{"name": "Christmas", "schedule": "range(12/01-12/31)", "color": ["#00FF00"]}]
            }
        })
    }

    #[test]
    fn test_every_catalog_module_renders_all_rows() {
        let root = root();
        let libs = LibraryCache::new();
        for m in catalog::catalog() {
            let scope = get_key(&root, &m.key);
            let form = render_form(&m.fields, &RenderCtx::new(scope, &root, &libs));
            assert_eq!(form.rows.len(), m.fields.len(), "{}", m.key);
        }
    }

    #[test]
    fn test_malformed_custom_field_is_skipped() {
        let fields = vec![
            FieldSchema::new("name", "Name", FieldKind::Text),
            FieldSchema::new("broken", "Broken", FieldKind::GdriveCustom),
        ];
        let root = json!({});
        let libs = LibraryCache::new();
        let form = render_form(&fields, &RenderCtx::new(&root, &root, &libs));
        assert_eq!(form.rows.len(), 1);
        assert_eq!(form.rows[0].key, "name");
    }

    #[test]
    fn test_holiday_cards() {
        let root = root();
        let libs = LibraryCache::new();
        let module = catalog::find("border_replacerr").unwrap();
        let form = render_form(
            &module.fields,
            &RenderCtx::new(&root["border_replacerr"], &root, &libs),
        );
        let Widget::Cards(list) = &form.row("holidays").unwrap().widget else {
            panic!("holidays should render as cards");
        };
        assert_eq!(list.cards[0].title, "Christmas");
        assert_eq!(list.cards[0].subtitle, "range(12/01-12/31)");
        assert_eq!(list.cards[0].swatches, vec!["#00FF00".to_string()]);
    }

    #[test]
    fn test_instance_picker_marks_selection_and_libraries() {
        let root = root();
        let mut libs = LibraryCache::new();
        libs.insert("plex_main".into(), vec!["Movies".into(), "Shows".into()]);
        let field = FieldSchema::new("instances", "Instances", FieldKind::Instances)
            .instance_types(&["radarr", "plex"]);
        let value = json!(["radarr_hd", {"plex_main": {"library_names": ["Shows"]}}]);
        let row = render_field(&field, &value, &RenderCtx::new(&root, &root, &libs)).unwrap();
        let Widget::Instances(p) = row.widget else {
            panic!("expected instance picker");
        };
        assert_eq!(p.groups.len(), 2);
        assert_eq!(p.checked_count(), 2);
        let plex = p.groups[1].choices[0].plex.as_ref().unwrap();
        assert!(plex.loaded);
        assert_eq!(
            plex.libraries,
            vec![("Movies".to_string(), false), ("Shows".to_string(), true)]
        );
    }

    #[test]
    fn test_show_if_instance_type() {
        let root = root();
        let field = FieldSchema::new("t", "T", FieldKind::Float).show_if("sonarr");
        assert!(is_visible(&field, &json!({"instance": "sonarr_main"}), &root));
        assert!(!is_visible(&field, &json!({"instance": "radarr_hd"}), &root));
        assert!(!is_visible(&field, &json!({}), &root));
    }
}
