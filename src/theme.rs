//! Light/dark theme preference and the key-value store it persists in.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;

use crate::error::StorageError;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Page background the viewport is cleared to, as RGBA. A native window
    /// has no page behind it, so the page colour is painted opaque and only
    /// the model pixels composite over it.
    pub fn background(&self) -> [f64; 4] {
        match self {
            Theme::Light => [0.97, 0.97, 0.98, 1.0],
            Theme::Dark => [0.02, 0.02, 0.04, 1.0],
        }
    }
}

/// String key-value persistence.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Non-persistent store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a flat TOML table, rewritten on every set.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        let contents = toml::to_string(&self.entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// The current theme together with the store it is persisted in.
#[derive(Debug)]
pub struct ThemeToggle<S: KeyValueStore> {
    store: S,
    theme: Theme,
}

impl<S: KeyValueStore> ThemeToggle<S> {
    /// Read the stored preference. Anything other than `"dark"` resets the
    /// stored value to `"light"`.
    pub fn mount(mut store: S) -> Result<Self, StorageError> {
        let theme = match store.get_item(THEME_KEY).as_deref() {
            Some("dark") => Theme::Dark,
            _ => {
                store.set_item(THEME_KEY, Theme::Light.as_str())?;
                Theme::Light
            }
        };
        debug!("theme on mount: {}", theme.as_str());
        Ok(Self { store, theme })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }

    /// Flip the theme and persist the new value.
    pub fn toggle(&mut self) -> Result<Theme, StorageError> {
        let next = self.theme.toggled();
        self.store.set_item(THEME_KEY, next.as_str())?;
        self.theme = next;
        Ok(next)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
