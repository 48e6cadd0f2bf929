//! Key-value persistence for credential, theme and history.
//!
//! Values are opaque strings; callers JSON-encode what they store. The
//! `KeyValueStore` trait can be implemented by different backends.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{StoreError, StoreResult};

/// Trait defining the interface for key-value stores
pub trait KeyValueStore: Send + Sync + Debug {
    /// Get the value stored under `key`
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Type alias for Arc-wrapped KeyValueStore trait objects
pub type KeyValueStoreRef = Arc<dyn KeyValueStore>;

fn lock_error<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Lock(e.to_string())
}

/// In-memory implementation of KeyValueStore
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.remove(key);
        Ok(())
    }
}

/// File-backed store: a single JSON object rewritten on every change.
///
/// Writes go to a temporary file that is renamed over the old one, and the
/// in-memory map only changes once that succeeds.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// File name used inside a data directory
    pub const FILE_NAME: &'static str = "storage.json";

    /// Open the store at `path`, starting empty if the file does not exist
    /// or cannot be parsed. A corrupt file is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!("Ignoring corrupt store at {}: {}", path.display(), e);
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened store at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Open `storage.json` inside `dir`.
    pub fn open_in_dir(dir: &Path) -> StoreResult<Self> {
        Self::open(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved store to {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}
