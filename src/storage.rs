//! Persistence Boundary
//!
//! The core treats its backing store as a synchronous string key-value store
//! with a quota failure mode. Two implementations are provided: an in-memory
//! store for tests and ephemeral sessions, and a file-backed store for
//! desktop installs. The core never assumes atomicity across multiple keys.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};

/// Synchronous get/set byte store the profile store persists through.
pub trait KeyValueStorage: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    /// Stores the value. Fails with [`CoreError::QuotaExceeded`] when the
    /// backing medium refuses the write for space reasons.
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Removes the key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> CoreResult<()>;
}

// ==================== In-memory store ====================

/// In-memory key-value store with an optional quota.
///
/// The quota counts total stored bytes and makes the quota failure mode
/// reproducible in tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn stored_bytes_excluding(&self, entries: &HashMap<String, String>, key: &str) -> usize {
        entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota_bytes {
            let projected =
                self.stored_bytes_excluding(&entries, key) + key.len() + value.len();
            if projected > quota {
                return Err(CoreError::QuotaExceeded);
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ==================== File-backed store ====================

/// File-backed key-value store; one file per key under a data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates the data directory if it does not exist.
    pub fn new<P: AsRef<Path>>(dir: P) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| CoreError::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers, not user input, but keep them
        // filesystem-safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        fs::write(self.path_for(key), value).map_err(|e| {
            if e.raw_os_error() == Some(28) {
                // ENOSPC
                CoreError::QuotaExceeded
            } else {
                CoreError::Storage(e.to_string())
            }
        })
    }

    fn remove(&self, key: &str) -> CoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(e.to_string())),
        }
    }
}

// ==================== Tests ====================
