//! Element tree, renderer, edits, validation and dialogs.
//!
//! Rendering is a pure function of the schema and the configuration tree.
//! User edits are [`edit::FieldMsg`] values applied to the tree by
//! [`edit::apply_msg`]; the affected rows are then re-rendered. Validation
//! reads the tree and annotates the rendered [`element::Form`].

/// Card-list editors for list-of-object fields.
pub mod cards;

/// Edit messages and the reducer that applies them.
pub mod edit;

/// Rows, widgets and forms.
pub mod element;

/// Modal dialog controller.
pub mod modal;

/// Directory picker and three-way choice dialogs.
pub mod picker;

/// Field renderer.
pub mod render;

/// Required-field validation.
pub mod validate;

pub use element::{Form, Row, Widget};
pub use modal::{ModalHandle, ModalStack};
