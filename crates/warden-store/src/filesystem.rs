//! Checksummed filesystem storage
//!
//! One file per key, named by the BLAKE3 hash of the key so that arbitrary
//! keys map to safe filenames. File layout:
//!
//! ```text
//! checksum [32] ‖ key length u16 BE ‖ key ‖ payload
//! ```
//!
//! The checksum is BLAKE3 over everything after it and is verified on every
//! read. Writes go to a temp file, are synced, then atomically renamed over
//! the target.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{validate_key, StateStore};
use warden_core::{Result, WardenError};

const DATA_EXTENSION: &str = "dat";
const TEMP_EXTENSION: &str = "tmp";
const HEADER_LEN: usize = 32 + 2;

#[cfg(unix)]
const FILE_PERMISSIONS: u32 = 0o600;
#[cfg(unix)]
const DIR_PERMISSIONS: u32 = 0o700;

/// Durable store rooted at a directory
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Open (creating if needed) a store under `base_path`
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            WardenError::storage(format!("Failed to create storage directory: {e}"))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&base_path, fs::Permissions::from_mode(DIR_PERMISSIONS))
                .map_err(|e| {
                    WardenError::storage(format!("Failed to set directory permissions: {e}"))
                })?;
        }

        info!("Initialized filesystem state store at {:?}", base_path);
        Ok(Self { base_path })
    }

    /// Directory holding the data files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes());
        self.base_path
            .join(format!("{}.{DATA_EXTENSION}", hash.to_hex()))
    }

    fn encode(key: &str, value: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(2 + key.len() + value.len());
        body.extend_from_slice(&(key.len() as u16).to_be_bytes());
        body.extend_from_slice(key.as_bytes());
        body.extend_from_slice(value);

        let mut file = Vec::with_capacity(32 + body.len());
        file.extend_from_slice(blake3::hash(&body).as_bytes());
        file.extend_from_slice(&body);
        file
    }

    /// Verify the checksum and split into (key, payload)
    fn decode(path: &Path, bytes: &[u8]) -> Result<(String, Vec<u8>)> {
        if bytes.len() < HEADER_LEN {
            return Err(WardenError::storage(format!(
                "Truncated state file {}",
                path.display()
            )));
        }
        let (checksum, body) = bytes.split_at(32);
        if blake3::hash(body).as_bytes() != checksum {
            return Err(WardenError::storage(format!(
                "Integrity check failed for {}",
                path.display()
            )));
        }
        let key_len = u16::from_be_bytes([body[0], body[1]]) as usize;
        let rest = &body[2..];
        if rest.len() < key_len {
            return Err(WardenError::storage(format!(
                "Corrupt key header in {}",
                path.display()
            )));
        }
        let key = std::str::from_utf8(&rest[..key_len])
            .map_err(|e| WardenError::storage(format!("Corrupt key in {}: {e}", path.display())))?
            .to_string();
        Ok((key, rest[key_len..].to_vec()))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let temp_path = path.with_extension(TEMP_EXTENSION);
        let mut file = File::create(&temp_path)
            .map_err(|e| WardenError::storage(format!("Failed to create temp file: {e}")))?;
        file.write_all(data)
            .map_err(|e| WardenError::storage(format!("Failed to write data: {e}")))?;
        file.sync_all()
            .map_err(|e| WardenError::storage(format!("Failed to sync: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(FILE_PERMISSIONS))
                .map_err(|e| WardenError::storage(format!("Failed to set permissions: {e}")))?;
        }

        fs::rename(&temp_path, path)
            .map_err(|e| WardenError::storage(format!("Failed to rename temp file: {e}")))?;

        // Persist the rename itself.
        #[cfg(unix)]
        {
            if let Err(e) = File::open(&self.base_path).and_then(|dir| dir.sync_all()) {
                warn!("Failed to sync storage directory: {e}");
            }
        }
        Ok(())
    }
}

impl StateStore for FilesystemStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.key_to_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WardenError::storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        let (stored_key, payload) = Self::decode(&path, &bytes)?;
        if stored_key != key {
            return Err(WardenError::storage(format!(
                "Key mismatch in {}: expected '{key}', found '{stored_key}'",
                path.display()
            )));
        }
        debug!(key, bytes = payload.len(), "loaded state");
        Ok(Some(payload))
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.key_to_path(key);
        self.write_atomic(&path, &Self::encode(key, value))?;
        debug!(key, bytes = value.len(), "stored state");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(self.key_to_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WardenError::storage(format!("Failed to remove '{key}': {e}"))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| WardenError::storage(format!("Failed to read directory: {e}")))?;
        for entry in entries {
            let path = entry
                .map_err(|e| WardenError::storage(format!("Failed to read entry: {e}")))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            let bytes = fs::read(&path)?;
            let (key, _) = Self::decode(&path, &bytes)?;
            keys.push(key);
        }
        keys.sort();
        Ok(keys)
    }
}
