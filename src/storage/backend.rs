use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::StorageError;

/// Capacity snapshot of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub quota_bytes: Option<u64>,
}

impl StorageUsage {
    pub fn remaining_bytes(&self) -> Option<u64> {
        self.quota_bytes
            .map(|quota| quota.saturating_sub(self.used_bytes))
    }
}

/// Raw string storage. Implementations must be safe to share across tasks.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn usage(&self) -> Result<StorageUsage, StorageError>;
}

/// Entry cost, counted the way browsers count local storage: key plus value.
fn entry_bytes(key: &str, value_len: u64) -> u64 {
    key.len() as u64 + value_len
}

fn check_quota(
    quota: Option<u64>,
    used_by_others: u64,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    if let Some(quota) = quota {
        let needed = entry_bytes(key, value.len() as u64);
        let available = quota.saturating_sub(used_by_others);
        if needed > available {
            return Err(StorageError::QuotaExceeded { needed, available });
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════
// File backend
// ═══════════════════════════════════════════

/// One JSON file per key under `root`. The directory is created on first write.
pub struct FileBackend {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Self {
        Self {
            root: root.into(),
            quota_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key.len() <= 128
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn used_bytes_excluding(&self, excluded: Option<&str>) -> Result<u64, StorageError> {
        let mut total = 0;
        for key in self.keys()? {
            if Some(key.as_str()) == excluded {
                continue;
            }
            let len = fs::metadata(self.path_for(&key)?)?.len();
            total += entry_bytes(&key, len);
        }
        Ok(total)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        check_quota(self.quota_bytes, self.used_bytes_excluding(Some(key))?, key, value)?;

        fs::create_dir_all(&self.root)?;
        // Write-then-rename so a crash never leaves a half-written value.
        let staging = self.root.join(format!(".{key}.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage {
            used_bytes: self.used_bytes_excluding(None)?,
            quota_bytes: self.quota_bytes,
        })
    }
}

// ═══════════════════════════════════════════
// Memory backend
// ═══════════════════════════════════════════

/// In-process map. Can be switched off to behave like disabled browser storage.
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
    available: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MemoryBackend {
    pub fn new(quota_bytes: Option<u64>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory backend disabled".into()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_available()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        let mut entries = self.lock()?;
        let used_by_others: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_bytes(k, v.len() as u64))
            .sum();
        check_quota(self.quota_bytes, used_by_others, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.ensure_available()?;
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        self.ensure_available()?;
        let used_bytes = self
            .lock()?
            .iter()
            .map(|(k, v)| entry_bytes(k, v.len() as u64))
            .sum();
        Ok(StorageUsage {
            used_bytes,
            quota_bytes: self.quota_bytes,
        })
    }
}

// ═══════════════════════════════════════════
// Scoped backend
// ═══════════════════════════════════════════

/// One namespace inside a shared backend, stored as `<prefix>.<key>`, with
/// its own quota. Lets every visitor keep a browser-sized store of their own.
pub struct ScopedBackend {
    inner: Arc<dyn StorageBackend>,
    prefix: String,
    quota_bytes: Option<u64>,
}

impl ScopedBackend {
    pub fn new(
        inner: Arc<dyn StorageBackend>,
        prefix: impl Into<String>,
        quota_bytes: Option<u64>,
    ) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
            quota_bytes,
        }
    }

    fn inner_key(&self, key: &str) -> String {
        format!("{}.{key}", self.prefix)
    }

    fn used_bytes_excluding(&self, excluded: Option<&str>) -> Result<u64, StorageError> {
        let mut total = 0;
        for key in self.keys()? {
            if Some(key.as_str()) == excluded {
                continue;
            }
            if let Some(value) = self.inner.read(&self.inner_key(&key))? {
                total += entry_bytes(&key, value.len() as u64);
            }
        }
        Ok(total)
    }
}

impl StorageBackend for ScopedBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(&self.inner_key(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_quota(self.quota_bytes, self.used_bytes_excluding(Some(key))?, key, value)?;
        self.inner.write(&self.inner_key(key), value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(&self.inner_key(key))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}.", self.prefix);
        Ok(self
            .inner
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage {
            used_bytes: self.used_bytes_excluding(None)?,
            quota_bytes: self.quota_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("store"), None);

        assert_eq!(backend.read("greeting").unwrap(), None);
        backend.write("greeting", "\"hello\"").unwrap();
        assert_eq!(backend.read("greeting").unwrap().as_deref(), Some("\"hello\""));
        assert_eq!(backend.keys().unwrap(), vec!["greeting".to_string()]);

        backend.delete("greeting").unwrap();
        assert_eq!(backend.read("greeting").unwrap(), None);
        // Deleting a missing key is not an error
        backend.delete("greeting").unwrap();
    }

    #[test]
    fn file_backend_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path(), None);
        assert!(matches!(
            backend.write("../escape", "1"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(backend.read(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn file_backend_enforces_quota() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path(), Some(20));
        backend.write("a", "0123456789").unwrap();
        let err = backend.write("b", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));

        // Overwriting an existing key only counts the new value
        backend.write("a", "0123456789abcdef").unwrap();
        let usage = backend.usage().unwrap();
        assert_eq!(usage.used_bytes, 17);
        assert_eq!(usage.remaining_bytes(), Some(3));
    }

    #[test]
    fn file_backend_keys_ignore_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path(), None);
        backend.write("theme", "\"dark\"").unwrap();
        fs::write(dir.path().join(".theme.tmp"), "junk").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["theme".to_string()]);
    }

    #[test]
    fn memory_backend_can_be_disabled() {
        let backend = MemoryBackend::default();
        backend.write("k", "1").unwrap();
        backend.set_available(false);
        assert!(matches!(backend.read("k"), Err(StorageError::Unavailable(_))));
        backend.set_available(true);
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn memory_backend_quota() {
        let backend = MemoryBackend::new(Some(8));
        backend.write("k", "1234567").unwrap();
        assert!(matches!(
            backend.write("j", "1"),
            Err(StorageError::QuotaExceeded { needed: 2, available: 0 })
        ));
    }

    #[test]
    fn scoped_backends_do_not_see_each_other() {
        let shared: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::default());
        let first = ScopedBackend::new(Arc::clone(&shared), "visitor.a1", Some(64));
        let second = ScopedBackend::new(Arc::clone(&shared), "visitor.b2", Some(64));

        first.write("theme", "\"dark\"").unwrap();
        assert_eq!(second.read("theme").unwrap(), None);
        assert_eq!(first.keys().unwrap(), vec!["theme".to_string()]);
        assert!(second.keys().unwrap().is_empty());
        assert_eq!(shared.keys().unwrap(), vec!["visitor.a1.theme".to_string()]);

        // Each scope is charged only for its own entries.
        assert!(matches!(
            first.write("blob", &"x".repeat(60)),
            Err(StorageError::QuotaExceeded { .. })
        ));
        second.write("blob", &"x".repeat(50)).unwrap();
        assert_eq!(second.usage().unwrap().used_bytes, 4 + 50);
    }
}
