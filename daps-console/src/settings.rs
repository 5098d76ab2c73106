//! Console settings stored in `daps-console.toml`.
//!
//! ```toml
//! base_url = "http://localhost:8000"
//! request_timeout_secs = 30
//! loader_min_visible_ms = 400
//! poll_interval_ms = 1000
//! theme_file = "/home/me/.config/daps-console/theme.json"
//! gdrive_presets_url = "https://example.org/gdrive_presets.json"
//! ```
//!
//! Every key is optional. A missing file means all defaults.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

pub const APP_DIR: &str = "daps-console";
pub const SETTINGS_FILE: &str = "daps-console.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Root URL of the DAPS web backend.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Shortest time the loading indicator stays on screen.
    pub loader_min_visible_ms: u64,
    /// Interval between run status polls.
    pub poll_interval_ms: u64,
    /// Overrides where the theme choice is stored.
    pub theme_file: Option<PathBuf>,
    /// JSON list of Google Drive presets offered when adding a source.
    pub gdrive_presets_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            loader_min_visible_ms: 400,
            poll_interval_ms: 1000,
            theme_file: None,
            gdrive_presets_url: None,
        }
    }
}

impl Settings {
    /// `<config dir>/daps-console`, or the working directory when the
    /// platform has no config dir.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn default_path() -> PathBuf {
        Self::default_dir().join(SETTINGS_FILE)
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn loader_min_visible(&self) -> Duration {
        Duration::from_millis(self.loader_min_visible_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Where the theme choice is kept.
    pub fn theme_path(&self) -> PathBuf {
        self.theme_file
            .clone()
            .unwrap_or_else(|| Self::default_dir().join("theme.json"))
    }

    /// Log file used while the terminal UI owns the screen.
    pub fn log_path() -> PathBuf {
        Self::default_dir().join("daps-console.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(Some(&dir.path().join("none.toml")))
            .await
            .unwrap();
        assert_eq!(s, Settings::default());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        tokio::fs::write(&path, "base_url = \"http://nas:8000\"\npoll_interval_ms = 250\n")
            .await
            .unwrap();
        let s = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(s.base_url, "http://nas:8000");
        assert_eq!(s.poll_interval(), Duration::from_millis(250));
        assert_eq!(s.request_timeout_secs, 30);
        assert_eq!(s.theme_file, None);
    }

    #[tokio::test]
    async fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        tokio::fs::write(&path, "base_url = [").await.unwrap();
        assert!(Settings::load(Some(&path)).await.is_err());
    }
}
