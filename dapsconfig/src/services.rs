//! Collaborators the form engine consumes but does not implement.
//!
//! The console crate backs these with HTTP calls to the DAPS backend; tests
//! back them with in-memory fakes.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Loads and persists the full configuration tree.
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// `GET /api/config`.
    async fn fetch_config(&self) -> Result<Value>;

    /// `POST /api/config` with `{module: subtree}`. Returns the saved config.
    async fn save_config(&self, payload: Value) -> Result<Value>;
}

/// Server-side directory browsing for directory pickers.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Child directory names of `path`.
    async fn list_directories(&self, path: &str) -> Result<Vec<String>>;

    async fn create_directory(&self, path: &str) -> Result<()>;
}

/// Live library lists of Plex instances.
#[async_trait]
pub trait PlexLibraries: Send + Sync {
    async fn libraries(&self, instance: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: ToastKind, message: &str);

    fn error(&self, message: &str) {
        self.notify(ToastKind::Error, message);
    }

    fn success(&self, message: &str) {
        self.notify(ToastKind::Success, message);
    }
}

/// Re-applies the UI theme after the interface module is saved.
pub trait ThemeApplier: Send + Sync {
    fn apply_theme(&self, ui_config: &Value);
}

/// Await a collaborator call; on failure, toast and return `fallback`.
///
/// This is the only way collaborator failures surface from the engine.
pub async fn or_toast<T>(
    fut: impl Future<Output = Result<T>>,
    notifier: &dyn Notifier,
    context: &str,
    fallback: T,
) -> T {
    match fut.await {
        Ok(v) => v,
        Err(e) => {
            warn!("{context}: {e}");
            notifier.error(&format!("{context}: {e}"));
            fallback
        }
    }
}
