//! Key-value persistence trait and built-in backends.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Persistence capability supplied by the hosting environment.
///
/// Mirrors browser local storage: a flat namespace of string keys, each
/// holding one string value. The store treats both operations as
/// synchronous; implementations should be cheap relative to the debounce
/// window.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if nothing has been written under `key`.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` for failures other than the key being absent.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// In-memory backend.
///
/// `Clone` is cheap and clones share the same map, so a host (or a test)
/// can keep a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// File-backed backend: one JSON file per key under a base directory.
///
/// The layout is:
/// ```text
/// <base_dir>/
///     <key>.json
///     <key>.json.tmp      -- only while a write is in flight
/// ```
///
/// Writes are atomic via a temp-rename pattern, so a crash mid-write
/// leaves the previous value in place rather than a truncated document.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new `FileStore` rooted at the given base directory.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Directory holding one file per key.
    ///   The directory does not need to exist yet; it is created lazily on
    ///   the first [`set`](KeyValueStore::set).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this backend.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the path of the file holding `key`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] if the key is empty or would
    /// escape the base directory.
    pub fn key_path(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {key:?}"),
            ));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.base_dir)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
