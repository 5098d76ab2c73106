use std::collections::BTreeMap;

use crate::{
    codec::{HolidayRange, Schedule},
    data::schema::FieldKind,
};

/// A rendered form: one row per schema field, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    pub rows: Vec<Row>,
    /// Key of the row the view should bring into sight (first invalid field).
    pub scroll_to: Option<String>,
}

/// Label column, input column and optional help/error text for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub widget: Widget,
    pub help: Option<String>,
    /// Inline error message set by validation.
    pub error: Option<String>,
    /// Hidden rows belong to another instance type.
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Text {
        value: String,
        placeholder: Option<String>,
        masked: bool,
        multiline: bool,
    },
    Number {
        value: String,
        float: bool,
    },
    Dropdown {
        options: Vec<String>,
        selected: Option<usize>,
    },
    Checkbox {
        checked: bool,
    },
    Json {
        text: String,
        parse_error: Option<String>,
    },
    Directory {
        path: String,
    },
    DirectoryList {
        entries: Vec<DirEntry>,
        reorderable: bool,
        /// Per-entry choices; empty when entries carry no option.
        options: Vec<String>,
    },
    Color {
        value: String,
    },
    ColorList {
        colors: Vec<String>,
        preview: bool,
    },
    Schedule {
        schedule: Schedule,
        text: String,
    },
    HolidayRange {
        range: Option<HolidayRange>,
        text: String,
    },
    Instances(InstancePicker),
    Cards(CardList),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub option: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancePicker {
    pub groups: Vec<InstanceGroup>,
    /// Per-instance inline messages, keyed by instance name.
    pub library_errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceGroup {
    pub instance_type: String,
    pub choices: Vec<InstanceChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceChoice {
    pub name: String,
    pub checked: bool,
    /// Present for Plex instances.
    pub plex: Option<PlexChoice>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlexChoice {
    /// Library name and whether it is selected.
    pub libraries: Vec<(String, bool)>,
    pub add_posters: bool,
    /// Whether the live library list has been fetched.
    pub loaded: bool,
}

impl InstancePicker {
    pub fn checked_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| &g.choices)
            .filter(|c| c.checked)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardList {
    pub cards: Vec<Card>,
    pub add_label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Card {
    /// Position of the entry in the parent array.
    pub index: usize,
    pub title: String,
    pub subtitle: String,
    pub swatches: Vec<String>,
}

impl Widget {
    /// One-line description of the current value, for list views.
    pub fn summary(&self) -> String {
        match self {
            Widget::Text { value, masked, .. } => {
                if *masked && !value.is_empty() {
                    "••••••".to_string()
                } else {
                    value.lines().next().unwrap_or_default().to_string()
                }
            }
            Widget::Number { value, .. } => value.clone(),
            Widget::Dropdown { options, selected } => selected
                .and_then(|i| options.get(i))
                .cloned()
                .unwrap_or_default(),
            Widget::Checkbox { checked } => if *checked { "[x]" } else { "[ ]" }.to_string(),
            Widget::Json { text, parse_error } => match parse_error {
                Some(_) => format!("{text} (invalid JSON)"),
                None => text.clone(),
            },
            Widget::Directory { path } => path.clone(),
            Widget::DirectoryList { entries, .. } => entries
                .iter()
                .map(|e| match &e.option {
                    Some(o) => format!("{} [{o}]", e.path),
                    None => e.path.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Widget::Color { value } => value.clone(),
            Widget::ColorList { colors, .. } => colors.join(" "),
            Widget::Schedule { text, .. } => text.clone(),
            Widget::HolidayRange { text, .. } => text.clone(),
            Widget::Instances(p) => p
                .groups
                .iter()
                .flat_map(|g| &g.choices)
                .filter(|c| c.checked)
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Widget::Cards(list) => format!("{} entries", list.cards.len()),
        }
    }
}

impl Form {
    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn row_mut(&mut self, key: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.key == key)
    }

    /// Whether the field is rendered and shown.
    pub fn has_input(&self, key: &str) -> bool {
        self.row(key).is_some_and(|r| r.visible)
    }

    /// Remove every error marker, including per-instance library messages.
    pub fn clear_errors(&mut self) {
        for row in &mut self.rows {
            row.error = None;
            if let Widget::Instances(p) = &mut row.widget {
                p.library_errors.clear();
            }
        }
        self.scroll_to = None;
    }

    pub fn set_error(&mut self, key: &str, message: String) {
        if let Some(row) = self.row_mut(key) {
            row.error = Some(message);
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.key.as_str(), e)))
    }

    /// Replace the rows with a fresh render, keeping the current markers.
    ///
    /// Markers only change when validation runs again.
    pub fn refresh(&mut self, mut fresh: Form) {
        for row in &mut fresh.rows {
            if let Some(old) = self.row(&row.key) {
                row.error = old.error.clone();
                if let (Widget::Instances(new), Widget::Instances(prev)) =
                    (&mut row.widget, &old.widget)
                {
                    new.library_errors = prev.library_errors.clone();
                }
            }
        }
        fresh.scroll_to = self.scroll_to.take();
        *self = fresh;
    }
}
