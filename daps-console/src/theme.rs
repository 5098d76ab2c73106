//! Persisted theme choice, read before the configuration loads.
//!
//! The store is a small JSON file: `{"theme": "dark"}`.

use std::{fmt, path::PathBuf, str::FromStr, sync::Mutex};

use anyhow::Context;
use dapsconfig::services::ThemeApplier;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        })
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(anyhow!("unknown theme `{other}`")),
        }
    }
}

/// Colors the terminal UI draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub error: Color,
}

impl Theme {
    pub fn palette(&self) -> Palette {
        match self {
            Theme::Dark => Palette {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                error: Color::LightRed,
            },
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::Gray,
                error: Color::Red,
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    theme: Theme,
}

/// File-backed theme store. Also the hook that re-applies the theme after
/// the interface module is saved.
#[derive(Debug)]
pub struct ThemeStore {
    path: PathBuf,
    current: Mutex<Theme>,
}

impl ThemeStore {
    /// Open the store; an unreadable or missing file means the default theme.
    pub fn open(path: PathBuf) -> Self {
        let theme = std::fs::read_to_string(&path)
            .ok()
            .and_then(|c| serde_json::from_str::<StoreFile>(&c).ok())
            .map(|f| f.theme)
            .unwrap_or_default();
        ThemeStore {
            path,
            current: Mutex::new(theme),
        }
    }

    pub fn current(&self) -> Theme {
        self.current.lock().map(|t| *t).unwrap_or_default()
    }

    pub fn set(&self, theme: Theme) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&StoreFile { theme })?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        if let Ok(mut t) = self.current.lock() {
            *t = theme;
        }
        Ok(())
    }
}

impl ThemeApplier for ThemeStore {
    fn apply_theme(&self, ui_config: &Value) {
        let Some(name) = ui_config.get("theme").and_then(Value::as_str) else {
            return;
        };
        match name.parse::<Theme>() {
            Ok(theme) => {
                if let Err(e) = self.set(theme) {
                    warn!("could not store theme: {e}");
                } else {
                    info!("theme set to {theme}");
                }
            }
            Err(e) => warn!("{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::open(dir.path().join("theme.json"));
        assert_eq!(store.current(), Theme::Dark);
    }

    #[test]
    fn test_apply_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("theme.json");
        let store = ThemeStore::open(path.clone());
        store.apply_theme(&json!({"theme": "light"}));
        assert_eq!(store.current(), Theme::Light);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"theme":"light"}"#
        );
        assert_eq!(ThemeStore::open(path).current(), Theme::Light);
    }

    #[test]
    fn test_unknown_theme_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::open(dir.path().join("theme.json"));
        store.apply_theme(&json!({"theme": "sepia"}));
        assert_eq!(store.current(), Theme::Dark);
    }
}
