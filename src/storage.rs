//! Catalog files on disk and the recently opened files cache.

use std::fs;
use std::io;
use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::store::KeyStore;

/// File name of the recently opened files cache inside the home directory.
pub const RECENT_FILES_NAME: &str = ".translation_app_config.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Written file {0} does not match the catalog")]
    Verification(PathBuf),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Loads one catalog file.
///
/// Never fails: a missing, unreadable or malformed file yields an empty store so
/// the session can still start.
#[must_use]
pub fn load_catalog_file(path: &Path) -> KeyStore {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Catalog file not found, starting empty: {}", path.display());
            return KeyStore::new();
        }
        Err(e) => {
            tracing::error!("Failed to read catalog file {}: {e}", path.display());
            return KeyStore::new();
        }
    };

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(json) => {
            let store = KeyStore::from_json(&json);
            tracing::debug!(
                leaves = store.leaf_count(),
                "Loaded catalog file: {}",
                path.display()
            );
            store
        }
        Err(e) => {
            tracing::error!("Malformed JSON in {}, starting empty: {e}", path.display());
            KeyStore::new()
        }
    }
}

/// Writes a store as pretty-printed JSON with a trailing newline.
///
/// The document goes to a sibling temp file first, is read back and compared,
/// and only then replaces `path`.
///
/// # Errors
/// Any I/O failure, or a read-back that does not match the store.
pub fn save_catalog_file(path: &Path, store: &KeyStore) -> Result<(), StorageError> {
    let json = store.to_json();
    let mut text = serde_json::to_string_pretty(&json)
        .map_err(|source| StorageError::Serialize { path: path.to_path_buf(), source })?;
    text.push('\n');

    let temp = temp_path(path);
    fs::write(&temp, &text).map_err(|e| StorageError::io(&temp, e))?;

    let written = fs::read_to_string(&temp).map_err(|e| StorageError::io(&temp, e))?;
    let verified = serde_json::from_str::<serde_json::Value>(&written).is_ok_and(|v| v == json);
    if !verified {
        let _ = fs::remove_file(&temp);
        return Err(StorageError::Verification(path.to_path_buf()));
    }

    fs::rename(&temp, path).map_err(|e| StorageError::io(path, e))?;
    tracing::debug!(leaves = store.leaf_count(), "Saved catalog file: {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// The pair of files opened last, remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFiles {
    pub pl_file: PathBuf,
    pub en_file: PathBuf,
}

impl RecentFiles {
    #[must_use]
    pub fn new(pl_file: impl Into<PathBuf>, en_file: impl Into<PathBuf>) -> Self {
        Self { pl_file: pl_file.into(), en_file: en_file.into() }
    }

    /// `$HOME/.translation_app_config.json`, if a home directory is known.
    #[must_use]
    pub fn default_location() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(RECENT_FILES_NAME))
    }

    /// Reads the cache at `location`.
    ///
    /// `None` when the cache is missing or corrupt, or when either recorded file
    /// no longer exists.
    #[must_use]
    pub fn load(location: &Path) -> Option<Self> {
        let content = fs::read_to_string(location).ok()?;
        let recent: Self = match serde_json::from_str(&content) {
            Ok(recent) => recent,
            Err(e) => {
                tracing::warn!("Ignoring corrupt recent files cache {}: {e}", location.display());
                return None;
            }
        };

        if recent.pl_file.is_file() && recent.en_file.is_file() {
            Some(recent)
        } else {
            tracing::debug!("Recent files no longer exist: {recent:?}");
            None
        }
    }

    /// Writes the cache to `location`. Failures are logged and otherwise ignored.
    pub fn store(&self, location: &Path) {
        let written = serde_json::to_string_pretty(self)
            .map_err(io::Error::other)
            .and_then(|mut text| {
                text.push('\n');
                fs::write(location, text)
            });
        if let Err(e) = written {
            tracing::warn!("Failed to write recent files cache {}: {e}", location.display());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::types::KeyPath;

    fn key(text: &str) -> KeyPath {
        KeyPath::parse(text).unwrap()
    }

    #[googletest::test]
    fn load_nested_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pl.json");
        fs::write(&path, r#"{"fruit": {"apple": "jabłko"}}"#).unwrap();

        let store = load_catalog_file(&path);
        expect_that!(store.get(&key("fruit.apple")), eq("jabłko"));
    }

    #[googletest::test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = load_catalog_file(&dir.path().join("missing.json"));
        expect_that!(store.is_empty(), eq(true));
    }

    #[googletest::test]
    fn load_malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        expect_that!(load_catalog_file(&path).is_empty(), eq(true));
    }

    #[googletest::test]
    fn save_writes_pretty_unescaped_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pl.json");
        let store = KeyStore::from_json(&json!({"fruit": {"apple": "jabłko"}}));

        save_catalog_file(&path, &store).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        expect_that!(
            written,
            eq("{\n  \"fruit\": {\n    \"apple\": \"jabłko\"\n  }\n}\n")
        );
        expect_that!(temp_path(&path).exists(), eq(false));
    }

    #[googletest::test]
    fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("pl.json");

        let result = save_catalog_file(&path, &KeyStore::new());
        expect_that!(result, err(matches_pattern!(StorageError::Io { .. })));
    }

    #[googletest::test]
    fn saved_file_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("en.json");
        let store = KeyStore::from_json(&json!({"a": {"b": "x", "c": "y"}, "d": "z"}));

        save_catalog_file(&path, &store).unwrap();
        expect_that!(load_catalog_file(&path), eq(&store));
    }

    #[googletest::test]
    fn recent_files_round_trip() {
        let dir = TempDir::new().unwrap();
        let pl = dir.path().join("pl.json");
        let en = dir.path().join("en.json");
        fs::write(&pl, "{}").unwrap();
        fs::write(&en, "{}").unwrap();
        let location = dir.path().join(RECENT_FILES_NAME);

        RecentFiles::new(&pl, &en).store(&location);

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&location).unwrap()).unwrap();
        expect_that!(stored["pl_file"].as_str(), some(ends_with("pl.json")));
        expect_that!(RecentFiles::load(&location), some(eq(&RecentFiles::new(&pl, &en))));
    }

    #[googletest::test]
    fn recent_files_with_vanished_file() {
        let dir = TempDir::new().unwrap();
        let pl = dir.path().join("pl.json");
        fs::write(&pl, "{}").unwrap();
        let location = dir.path().join(RECENT_FILES_NAME);

        RecentFiles::new(&pl, dir.path().join("gone.json")).store(&location);
        expect_that!(RecentFiles::load(&location), none());
    }

    #[googletest::test]
    fn recent_files_corrupt_or_missing() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join(RECENT_FILES_NAME);
        expect_that!(RecentFiles::load(&location), none());

        fs::write(&location, "[]").unwrap();
        expect_that!(RecentFiles::load(&location), none());
    }
}
