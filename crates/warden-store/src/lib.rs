//! Durable state for Warden
//!
//! The consumed-authorization set and the vault accounting must survive
//! process restarts: losing the consumed set reopens replay. Both are kept as
//! whole JSON documents under fixed keys in a [`StateStore`].

#![allow(clippy::result_large_err)]

/// Checksummed filesystem backend
pub mod filesystem;
/// In-memory backend
pub mod memory;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use warden_core::{Result, StorageBackend, StorageConfig, WardenError};

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 255;

/// Key/value store for serialized ledger state
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Durably replace the value stored under `key`
    fn store(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key` if present
    fn remove(&self, key: &str) -> Result<()>;

    /// Keys currently present
    fn keys(&self) -> Result<Vec<String>>;
}

/// Read and decode a JSON document
pub fn load_json<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> Result<Option<T>> {
    match store.load(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and durably write a JSON document
pub fn store_json<T: Serialize>(store: &dyn StateStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    store.store(key, &bytes)
}

/// Reject keys that are empty, too long or could escape a directory
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(WardenError::storage("Key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(WardenError::storage(format!(
            "Key too long (max {MAX_KEY_LEN} bytes)"
        )));
    }
    if key.contains("..") || key.contains('\0') {
        return Err(WardenError::storage("Key contains invalid characters"));
    }
    Ok(())
}

/// Open the backend selected in configuration
pub fn open_configured(config: &StorageConfig) -> Result<Arc<dyn StateStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Filesystem => {
            let path = config.path.clone().ok_or_else(|| {
                WardenError::config("storage.path is required for the filesystem backend")
            })?;
            Ok(Arc::new(FilesystemStore::open(path)?))
        }
    }
}
