//! Application preferences
//!
//! Preferences are plain string key/value pairs kept in a [`PrefStore`].
//! Two stores are provided:
//! - **Memory**: process-local, for tests and ephemeral sessions
//! - **File**: a json object in the user config directory
//!   (`$CARLOG_PREFS_FILE`, or `<config_dir>/carlog/preferences.json`)
//!
//! [`AppPreferences`] is the typed view used by front ends.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::debug;

use crate::{
    config::{CARLOG_PREFS_FILE_ENV, DEFAULT_CONFIG_DIR, DEFAULT_PREFS_FILE},
    error::{ConfigSnafu, FileSnafu, ParseSnafu, PrefStoreError},
};

const KEY_PRIMARY_COLOR: &str = "app_primary_color";
const KEY_ACCENT_COLOR: &str = "app_accent_color";
const KEY_BACKGROUND_IMAGE: &str = "app_background_image";

/// Indigo
pub const DEFAULT_PRIMARY_COLOR: &str = "oklch(0.45 0.15 265)";
/// Green
pub const DEFAULT_ACCENT_COLOR: &str = "oklch(0.93 0.08 150)";

/// Key-value store for preferences.
pub trait PrefStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PrefStoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PrefStoreError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), PrefStoreError>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryPrefStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPrefStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefStore for MemoryPrefStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefStoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefStoreError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PrefStoreError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Json file store. The file is read on every access and rewritten on every change.
#[derive(Debug)]
pub struct FilePrefStore {
    path: PathBuf,
    // serializes read-modify-write within this process
    lock: Mutex<()>,
}

impl FilePrefStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at [`FilePrefStore::default_path`]
    pub fn open_default() -> Result<Self, PrefStoreError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// `$CARLOG_PREFS_FILE` if set, else `<config_dir>/carlog/preferences.json`
    pub fn default_path() -> Result<PathBuf, PrefStoreError> {
        if let Ok(path) = std::env::var(CARLOG_PREFS_FILE_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }
        let dir = dirs::config_dir().ok_or_else(|| PrefStoreError::Config {
            message: format!(
                "no user config directory on this platform; set {CARLOG_PREFS_FILE_ENV}"
            ),
        })?;
        Ok(dir.join(DEFAULT_CONFIG_DIR).join(DEFAULT_PREFS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, PrefStoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).context(ParseSnafu { path: &self.path }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(PrefStoreError::File {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), PrefStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(FileSnafu { path: parent })?;
        }
        let json = serde_json::to_vec_pretty(map).context(ParseSnafu { path: &self.path })?;
        fs::write(&self.path, json).context(FileSnafu { path: &self.path })
    }
}

impl PrefStore for FilePrefStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefStoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefStoreError> {
        debug!(path = ?self.path, key, "set preference");
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), PrefStoreError> {
        debug!(path = ?self.path, key, "remove preference");
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Display preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPreferences {
    pub primary_color: String,
    pub accent_color: String,
    /// Image url or data uri
    pub background_image: Option<String>,
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            background_image: None,
        }
    }
}

impl AppPreferences {
    /// Loads preferences; absent or empty keys take their defaults.
    pub fn load(store: &dyn PrefStore) -> Result<Self, PrefStoreError> {
        let defaults = Self::default();
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Ok(Self {
            primary_color: non_empty(store.get(KEY_PRIMARY_COLOR)?)
                .unwrap_or(defaults.primary_color),
            accent_color: non_empty(store.get(KEY_ACCENT_COLOR)?).unwrap_or(defaults.accent_color),
            background_image: non_empty(store.get(KEY_BACKGROUND_IMAGE)?),
        })
    }

    /// Saves all preferences. A `None` background image removes the stored key.
    pub fn save(&self, store: &dyn PrefStore) -> Result<(), PrefStoreError> {
        store.set(KEY_PRIMARY_COLOR, &self.primary_color)?;
        store.set(KEY_ACCENT_COLOR, &self.accent_color)?;
        match &self.background_image {
            Some(image) => store.set(KEY_BACKGROUND_IMAGE, image),
            None => store.remove(KEY_BACKGROUND_IMAGE),
        }
    }

    /// Restores defaults and saves them.
    pub fn reset(store: &dyn PrefStore) -> Result<Self, PrefStoreError> {
        let prefs = Self::default();
        prefs.save(store)?;
        Ok(prefs)
    }

    /// Sets the primary color, rejecting strings that are not css colors.
    pub fn set_primary_color(&mut self, color: &str) -> Result<(), PrefStoreError> {
        self.primary_color = checked_color(color)?;
        Ok(())
    }

    pub fn set_accent_color(&mut self, color: &str) -> Result<(), PrefStoreError> {
        self.accent_color = checked_color(color)?;
        Ok(())
    }

    /// Foreground color readable on the primary color
    pub fn primary_foreground(&self) -> &'static str {
        foreground_for(&self.primary_color)
    }

    pub fn accent_foreground(&self) -> &'static str {
        foreground_for(&self.accent_color)
    }
}

fn checked_color(color: &str) -> Result<String, PrefStoreError> {
    let color = color.trim();
    ensure!(
        is_valid_color(color),
        ConfigSnafu {
            message: format!("'{color}' is not a color (expected #hex, rgb(), hsl(), or oklch())"),
        }
    );
    Ok(color.to_string())
}

/// Loose css color check
pub fn is_valid_color(color: &str) -> bool {
    ["#", "rgb", "hsl", "oklch"]
        .iter()
        .any(|prefix| color.starts_with(prefix))
}

/// Black or white, whichever reads better on `color`.
/// Lightness is taken from `oklch(L ...)` or approximated from `#rrggbb`; other forms count as mid-gray.
pub fn foreground_for(color: &str) -> &'static str {
    let lightness = if let Some(rest) = color.strip_prefix("oklch(") {
        rest.split(|c: char| c.is_whitespace() || c == ')')
            .find(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.5)
    } else if let Some(hex) = color.strip_prefix('#') {
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map_or(0.0, f64::from)
        };
        (0.299 * channel(0) + 0.587 * channel(2) + 0.114 * channel(4)) / 255.0
    } else {
        0.5
    };
    if lightness > 0.55 {
        "oklch(0 0 0)"
    } else {
        "oklch(1 0 0)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let store = MemoryPrefStore::new();
        let prefs = AppPreferences::load(&store).unwrap();
        assert_eq!(prefs, AppPreferences::default());
        assert_eq!(prefs.primary_color, DEFAULT_PRIMARY_COLOR);
        assert!(prefs.background_image.is_none());
    }

    #[test]
    fn test_save_none_removes_background() {
        let store = MemoryPrefStore::new();
        let mut prefs = AppPreferences {
            background_image: Some("https://example.com/bg.png".into()),
            ..Default::default()
        };
        prefs.set_primary_color("#112233").unwrap();
        prefs.save(&store).unwrap();
        assert_eq!(
            store.get(KEY_BACKGROUND_IMAGE).unwrap().as_deref(),
            Some("https://example.com/bg.png")
        );
        assert_eq!(AppPreferences::load(&store).unwrap(), prefs);

        prefs.background_image = None;
        prefs.save(&store).unwrap();
        assert_eq!(store.get(KEY_BACKGROUND_IMAGE).unwrap(), None);
        assert_eq!(
            store.get(KEY_PRIMARY_COLOR).unwrap().as_deref(),
            Some("#112233")
        );
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut prefs = AppPreferences::default();
        let err = prefs.set_accent_color("banana").unwrap_err();
        assert!(matches!(err, PrefStoreError::Config { .. }));
        assert_eq!(prefs.accent_color, DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn test_foreground_for() {
        assert_eq!(foreground_for("oklch(0.93 0.08 150)"), "oklch(0 0 0)");
        assert_eq!(foreground_for("oklch(0.45 0.15 265)"), "oklch(1 0 0)");
        assert_eq!(foreground_for("#ffffff"), "oklch(0 0 0)");
        assert_eq!(foreground_for("#000080"), "oklch(1 0 0)");
        assert_eq!(foreground_for("rgb(1,2,3)"), "oklch(1 0 0)");
    }

    #[test]
    fn test_file_store_roundtrip() -> Result<(), PrefStoreError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.json");
        let store = FilePrefStore::new(&path);

        assert_eq!(store.get("missing")?, None);
        // removing from a file that does not exist yet is fine
        store.remove("missing")?;

        store.set(KEY_ACCENT_COLOR, "hsl(10 20% 30%)")?;
        store.set("other", "x")?;
        let reopened = FilePrefStore::new(&path);
        assert_eq!(
            reopened.get(KEY_ACCENT_COLOR)?.as_deref(),
            Some("hsl(10 20% 30%)")
        );

        reopened.remove("other")?;
        assert_eq!(store.get("other")?, None);
        let prefs = AppPreferences::load(&store)?;
        assert_eq!(prefs.accent_color, "hsl(10 20% 30%)");
        assert_eq!(prefs.primary_color, DEFAULT_PRIMARY_COLOR);
        Ok(())
    }

    #[test]
    fn test_file_store_bad_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let store = FilePrefStore::new(&path);
        let err = store.get(KEY_PRIMARY_COLOR).unwrap_err();
        assert!(matches!(err, PrefStoreError::Parse { .. }));
    }
}
