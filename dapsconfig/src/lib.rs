//! # dapsconfig
//!
//! Schema-driven form engine behind the DAPS settings console.
//!
//! A configurable module is described once as a [`data::schema::ModuleSchema`].
//! The engine turns that description plus the persisted configuration tree into
//! an element tree of rows and widgets, applies user edits back into the tree,
//! validates required fields and drives modal editors for list-of-object fields.
//!
//! ## Features
//!
//! - Closed set of field kinds with exhaustive dispatch
//! - Card-based editors for Google Drive sources, holiday presets, upgrade
//!   instances and label mappings
//! - Compact schedule and holiday-range codecs that round-trip exactly
//! - Validate-before-commit modal stack with nested dialogs
//! - Per-module edit session with dirty tracking and save/discard prompts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dapsconfig::data::catalog;
//! use dapsconfig::ui::render::{RenderCtx, render_form};
//!
//! let root = serde_json::json!({"general": {"log_level": "info"}});
//! let module = catalog::find("general").unwrap();
//! let libraries = Default::default();
//! let ctx = RenderCtx::new(&root["general"], &root, &libraries);
//! let form = render_form(&module.fields, &ctx);
//! assert!(!form.rows.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema model, module catalog, config tree helpers, session state
//! - [`codec`] - Schedule and holiday range text formats
//! - [`ui`] - Element tree, field renderer, validation and modal controller
//! - [`session`] - Per-module form orchestrator
//! - [`services`] - Traits for the HTTP collaborators the engine consumes

#[macro_use]
extern crate log;

/// Schema model, module catalog and configuration state.
pub mod data;

/// Textual micro-formats stored in the configuration.
pub mod codec;

/// Error types shared across the engine.
pub mod error;

/// Collaborator traits (config API, directories, Plex libraries, toasts).
pub mod services;

/// Module edit session: load, edit, validate and save.
pub mod session;

/// Element tree, renderer, validation engine and modal controller.
pub mod ui;

pub use error::{FormError, Result};
pub use serde_json::Value;
