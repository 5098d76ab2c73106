//! Application context.
//!
//! [`AppContext`] owns the settings and every long-lived collaborator: the
//! HTTP client, the toast queue, the theme store and the preset cache. Commands
//! and the terminal UI borrow it.

use std::{sync::Arc, time::Duration};

use dapsconfig::session::FormController;

use crate::{
    api::{ApiClient, PresetCatalog},
    loader::Loader,
    settings::Settings,
    theme::ThemeStore,
    toast::ToastQueue,
};

const TOAST_TTL: Duration = Duration::from_secs(4);

pub struct AppContext {
    pub settings: Settings,
    pub api: Arc<ApiClient>,
    pub toasts: Arc<ToastQueue>,
    pub theme: Arc<ThemeStore>,
    pub presets: PresetCatalog,
}

impl AppContext {
    /// Build the context. With `echo` set, toasts are also printed to stderr,
    /// which is what one-shot commands want.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: Settings, echo: bool) -> anyhow::Result<Self> {
        let api = ApiClient::new(&settings.base_url, settings.request_timeout())?;
        let toasts = ToastQueue::new(TOAST_TTL);
        let toasts = if echo { toasts.echoing() } else { toasts };
        let theme = ThemeStore::open(settings.theme_path());
        debug!(
            "backend {}, theme {} from {}",
            api.base_url(),
            theme.current(),
            settings.theme_path().display()
        );
        Ok(AppContext {
            presets: PresetCatalog::new(settings.gdrive_presets_url.clone()),
            api: Arc::new(api),
            toasts: Arc::new(toasts),
            theme: Arc::new(theme),
            settings,
        })
    }

    /// A form controller wired to this context's collaborators.
    pub fn controller(&self) -> FormController {
        FormController::new(self.api.clone(), self.toasts.clone())
            .with_plex(self.api.clone())
            .with_theme(self.theme.clone())
    }

    pub fn loader(&self) -> Loader {
        Loader::new(self.settings.loader_min_visible())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_url: "http://nas:8000/".to_string(),
            theme_file: Some(dir.path().join("theme.json")),
            ..Settings::default()
        };
        let ctx = AppContext::new(settings, false).unwrap();
        assert!(ctx.api.base_url().starts_with("http://nas:8000"));
        assert!(ctx.controller().session().is_none());
        assert!(!ctx.loader().is_visible(std::time::Instant::now()));
    }
}
