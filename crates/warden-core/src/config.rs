//! Deployment configuration
//!
//! Loaded from TOML, then overridden from `WARDEN_*` environment variables,
//! then validated. Identifiers and keys are hex strings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{Result, WardenError};
use crate::identifiers::{AccountId, DomainId, ResourceId};
use crate::signature::SignerIdentity;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WARDEN_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Execution-environment identifier shared by authority and vault
    pub domain_id: DomainId,
    /// Authority settings
    pub authority: AuthorityConfig,
    /// Vault settings
    pub vault: VaultConfig,
    /// Durable state settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Authority settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityConfig {
    /// Public key of the off-line signer
    pub signer: SignerIdentity,
    /// Administrative owner allowed to bind the authority
    pub owner: AccountId,
}

/// Vault settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Identifier of this vault instance
    pub resource_id: ResourceId,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Volatile, process-local state
    #[default]
    Memory,
    /// Checksummed files under `path`
    Filesystem,
}

/// Durable state settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend to open
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the filesystem backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl WardenConfig {
    /// Parse from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load from a file, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WARDEN_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an explicit variable list
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DOMAIN_ID" => {
                    let id = value
                        .parse::<u64>()
                        .map_err(|e| WardenError::config(format!("{key}: {e}")))?;
                    self.domain_id = DomainId::new(id);
                }
                "VAULT_RESOURCE_ID" => self.vault.resource_id = value.parse()?,
                "STORAGE_PATH" => self.storage.path = Some(PathBuf::from(value)),
                "STORAGE_BACKEND" => {
                    self.storage.backend = match value.as_str() {
                        "memory" => StorageBackend::Memory,
                        "filesystem" => StorageBackend::Filesystem,
                        other => {
                            return Err(WardenError::config(format!(
                                "{key}: unknown backend '{other}'"
                            )))
                        }
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.authority.owner.is_null() {
            return Err(WardenError::config("authority.owner must not be null"));
        }
        if self.vault.resource_id.is_null() {
            return Err(WardenError::config("vault.resource_id must not be null"));
        }
        if self.storage.backend == StorageBackend::Filesystem && self.storage.path.is_none() {
            return Err(WardenError::config(
                "storage.path is required for the filesystem backend",
            ));
        }
        Ok(())
    }
}
