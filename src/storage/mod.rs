//! Local key/value persistence with JSON values.
//!
//! Mirrors the website's browser storage contract: saves report success as a
//! bool, loads fall back to a caller-provided default, and corrupted entries
//! are dropped instead of surfacing errors. Two backends are provided:
//! - `FileBackend`: one `<key>.json` file per key, quota-enforced
//! - `MemoryBackend`: in-process map for tests and ephemeral demo sessions
//!
//! `ScopedBackend` carves a per-visitor namespace out of either one.

pub mod backend;
pub mod prefs;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, ScopedBackend, StorageBackend, StorageUsage};
pub use store::LocalStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}
