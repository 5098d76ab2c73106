//! Configuration data structures and schema model.
//!
//! - [`schema`] - Field and module schemas, the closed set of field kinds
//! - [`catalog`] - Built-in schemas for every DAPS module, in display order
//! - [`value`] - Helpers over the untyped configuration tree
//! - [`instances`] - Instance lookups and the mixed instance selection list
//! - [`app_data`] - Edit session state with explicit dirty transitions

/// Edit session state container.
pub mod app_data;

/// Built-in module schemas.
pub mod catalog;

/// Instance lookups against the root configuration.
pub mod instances;

/// Field and module schema definitions.
pub mod schema;

/// Configuration tree helpers.
pub mod value;

pub use app_data::AppState;
pub use schema::{FieldKind, FieldSchema, ModuleSchema};
