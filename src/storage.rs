use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// StorageError
///
/// Failures of the durable key/value backend. The session layer degrades read
/// failures to "no session"; write failures are surfaced to the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("storage document could not be (de)serialized: {0}")]
    Format(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// 1. KeyValueStore Contract
/// KeyValueStore
///
/// A synchronous, durable string-to-string store: the server-side counterpart of
/// browser local storage. Writers replace a key's value as a whole, so a reader
/// sees either the previous value or the new one.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when the key is absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// KeyValueState
///
/// The shared handle to the key/value backend held in the application state.
pub type KeyValueState = Arc<dyn KeyValueStore>;

// 2. The Real Implementation (single JSON document on disk)
/// FileKeyValueStore
///
/// Persists all keys as one JSON object. Every write goes to a sibling temporary
/// file which is then renamed over the original, so a crash mid-write leaves the
/// previous document intact.
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serialises read-modify-write cycles issued from concurrent requests.
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// new
    ///
    /// Creates the store, making the parent directory if needed. The file itself
    /// is created lazily on the first write.
    pub fn new(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sibling temp path unique to this process and instant, so writers sharing
    /// the document never write through each other's temp file.
    fn temp_path(&self) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let suffix = format!("tmp.{}.{}", std::process::id(), ts);
        let ext = match self.path.extension().and_then(|e| e.to_str()) {
            Some(orig) => format!("{orig}.{suffix}"),
            None => suffix,
        };
        self.path.with_extension(ext)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let body = serde_json::to_vec_pretty(entries)?;
        let tmp = self.temp_path();

        let written = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp)
            .and_then(|mut file| {
                file.write_all(&body)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&tmp, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Loads the document for a mutation. A corrupt document is discarded so the
    /// next write heals the file instead of failing forever.
    fn load_for_update(&self) -> StorageResult<BTreeMap<String, String>> {
        match self.load() {
            Err(StorageError::Format(e)) => {
                tracing::warn!(path = %self.path.display(), "discarding corrupt key/value file: {}", e);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("write lock poisoned".to_string()))?;
        let mut entries = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("write lock poisoned".to_string()))?;
        let mut entries = self.load_for_update()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

// 3. The In-Memory Implementation (For Tests)
/// MemoryKeyValueStore
///
/// In-process store used by unit and integration tests so that session handling
/// can be exercised without touching the disk.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    /// When true, every operation returns a simulated failure.
    pub should_fail: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            entries: Mutex::default(),
            should_fail: true,
        }
    }

    /// Seeds `key` with arbitrary raw content, including content that is not a
    /// valid session record.
    pub fn with_raw(key: &str, raw: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), raw.to_string());
        store
    }

    fn check(&self) -> StorageResult<()> {
        if self.should_fail {
            return Err(StorageError::Unavailable(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check()?;
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.entries().remove(key);
        Ok(())
    }
}
