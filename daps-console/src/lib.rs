//! # daps-console
//!
//! Terminal settings console for DAPS.
//!
//! `daps-console` drives the [`dapsconfig`] form engine against a running DAPS
//! web backend. It edits module settings in an interactive terminal UI, and
//! offers one-shot commands for scripting: show or validate a module, start and
//! watch runs, search poster assets, switch the theme.
//!
//! ## Features
//!
//! - **Settings editor**: every DAPS module, with card dialogs, directory
//!   picker and unsaved-changes prompt
//! - **Instance checks**: connection test before an instance is saved
//! - **Run control**: start, cancel and watch module runs
//! - **Poster search**: year-aware fuzzy search over poster assets
//!
//! ## Modules
//!
//! - [`api`] - HTTP client for the DAPS backend
//! - [`ctx`] - Shared application context
//! - [`loader`] - Loading indicator timing
//! - [`posters`] - Poster asset index
//! - [`scheduler`] - Run status watcher
//! - [`settings`] - Console settings file
//! - [`theme`] - Theme store and palettes
//! - [`toast`] - Notification queue
//! - [`tui`] - Interactive terminal UI

/// HTTP client for the DAPS backend.
pub mod api;

/// Application context shared by every command.
pub mod ctx;

pub mod loader;

/// Poster asset search.
pub mod posters;

/// Background watcher for module runs.
pub mod scheduler;

/// Console settings (`daps-console.toml`).
pub mod settings;

pub mod theme;

pub mod toast;

/// Interactive terminal UI.
///
/// A ratatui front end over the [`dapsconfig`] element tree.
pub mod tui;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
