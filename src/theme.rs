/// Process-wide theme preference.
///
/// The theme lives in one global slot with explicit accessors: [`init`] at startup,
/// then [`current`], [`set`] and [`toggle`]. The choice is persisted under the fixed
/// `theme` key of `settings.json`; when nothing is stored, the OS color-scheme hint
/// decides.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ThemeError;

/// Key under which the preference is stored.
pub const THEME_KEY: &str = "theme";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

/// JSON settings file holding the persisted preference.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ThemeStore { path: path.into() }
    }

    /// Store at `<dir>/settings.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        ThemeStore::new(dir.as_ref().join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_settings(&self) -> Result<BTreeMap<String, Value>, ThemeError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn load(&self) -> Result<Option<Theme>, ThemeError> {
        let settings = self.read_settings()?;
        match settings.get(THEME_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Writes the preference, keeping any other keys in the file.
    pub fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        let mut settings = self.read_settings()?;
        settings.insert(THEME_KEY.to_string(), serde_json::to_value(theme)?);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&settings)?)?;
        Ok(())
    }
}

static CURRENT: RwLock<Option<Theme>> = RwLock::new(None);

fn write_slot(theme: Theme) {
    let mut slot = CURRENT.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(theme);
}

/// Loads the stored preference, falling back to the OS hint, and publishes it.
pub fn init(store: &ThemeStore, os_prefers_dark: bool) -> Theme {
    let stored = store.load().unwrap_or_else(|err| {
        warn!(error = %err, path = %store.path().display(), "ignoring unreadable settings");
        None
    });
    let theme = stored.unwrap_or(if os_prefers_dark {
        Theme::Dark
    } else {
        Theme::Light
    });
    debug!(%theme, stored = stored.is_some(), "theme initialized");
    write_slot(theme);
    theme
}

pub fn current() -> Result<Theme, ThemeError> {
    CURRENT
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .ok_or(ThemeError::Uninitialized)
}

/// Publishes and persists `theme`.
pub fn set(store: &ThemeStore, theme: Theme) -> Result<Theme, ThemeError> {
    write_slot(theme);
    store.save(theme)?;
    Ok(theme)
}

pub fn toggle(store: &ThemeStore) -> Result<Theme, ThemeError> {
    let next = current()?.toggled();
    set(store, next)
}

/// Terminal stand-in for `prefers-color-scheme: dark`, read from `COLORFGBG`
/// (`"<fg>;<bg>"`, dark backgrounds being palette colors 0-6 and 8).
pub fn os_prefers_dark() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|value| colorfgbg_is_dark(&value))
        .unwrap_or(false)
}

fn colorfgbg_is_dark(value: &str) -> Option<bool> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(bg <= 6 || bg == 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_roundtrip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);

        std::fs::write(store.path(), r#"{"other": 1}"#).unwrap();
        store.save(Theme::Dark).unwrap();
        assert_eq!(store.load().unwrap(), Some(Theme::Dark));

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["other"], 1);
    }

    #[test]
    fn test_colorfgbg() {
        assert_eq!(colorfgbg_is_dark("15;0"), Some(true));
        assert_eq!(colorfgbg_is_dark("0;15"), Some(false));
        assert_eq!(colorfgbg_is_dark("garbage"), None);
    }

    // One test touches the global slot so parallel tests cannot interleave on it.
    #[test]
    fn test_global_theme_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::in_dir(dir.path());

        assert_eq!(init(&store, true), Theme::Dark);
        assert_eq!(current().unwrap(), Theme::Dark);

        assert_eq!(toggle(&store).unwrap(), Theme::Light);
        assert_eq!(store.load().unwrap(), Some(Theme::Light));

        // Stored value wins over the OS hint.
        assert_eq!(init(&store, true), Theme::Light);
    }
}
