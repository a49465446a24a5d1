use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::backend::{FileBackend, MemoryBackend, ScopedBackend, StorageBackend, StorageUsage};

const AVAILABILITY_SENTINEL_KEY: &str = "__kraftodent_storage_test__";

/// JSON key/value store. Every operation degrades instead of failing:
/// errors are logged and the caller gets `false` or its default back.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// File-backed store under `root` with a byte quota.
    pub fn file(root: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self::new(Arc::new(FileBackend::new(root, Some(quota_bytes))))
    }

    /// Unbounded in-memory store.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    /// A store over the `prefix` namespace of this one, with its own quota.
    pub fn scoped(&self, prefix: &str, quota_bytes: Option<u64>) -> Self {
        Self::new(Arc::new(ScopedBackend::new(
            Arc::clone(&self.backend),
            prefix,
            quota_bytes,
        )))
    }

    /// Serialize `value` and store it under `key`. Returns `false` on any failure.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize value for storage");
                return false;
            }
        };
        match self.backend.write(key, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to save to local storage");
                false
            }
        }
    }

    /// Load and deserialize `key`, or return `default` when the key is absent,
    /// the store is unavailable, or the stored JSON is corrupt. Corrupt entries
    /// are removed.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read from local storage");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Corrupted storage entry, removing");
                if let Err(e) = self.backend.delete(key) {
                    tracing::debug!(key, error = %e, "Could not remove corrupted entry");
                }
                default
            }
        }
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.backend.read(key), Ok(Some(_)))
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(key) {
            tracing::warn!(key, error = %e, "Failed to remove from local storage");
        }
    }

    /// Write/read/delete round-trip with a sentinel key.
    pub fn is_available(&self) -> bool {
        let round_trip = || -> Result<bool, super::StorageError> {
            self.backend.write(AVAILABILITY_SENTINEL_KEY, "1")?;
            let read_back = self.backend.read(AVAILABILITY_SENTINEL_KEY)?;
            self.backend.delete(AVAILABILITY_SENTINEL_KEY)?;
            Ok(read_back.as_deref() == Some("1"))
        };
        match round_trip() {
            Ok(ok) => ok,
            Err(e) => {
                tracing::debug!(error = %e, "Local storage unavailable");
                false
            }
        }
    }

    /// Capacity introspection; `None` when the backend cannot report it.
    pub fn usage(&self) -> Option<StorageUsage> {
        match self.backend.usage() {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::debug!(error = %e, "Storage usage unavailable");
                None
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_default()
    }
}
