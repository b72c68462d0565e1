//! Unified error system for Warden
//!
//! Every precondition failure in the authority or the vault maps to exactly one
//! variant here. None of the protocol variants are retried by the core; a caller
//! must correct its input (for example by obtaining a fresh authorization)
//! before trying again.

use serde::{Deserialize, Serialize};

use crate::identifiers::{Amount, DomainId};

/// Unified error type for all Warden operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum WardenError {
    /// The authority is already bound to a vault
    #[error("authority is already bound to a resource")]
    AlreadyBound,

    /// Administrative call from someone other than the owner
    #[error("caller is not the administrative owner")]
    Unauthorized,

    /// Verification requested by a resource other than the bound vault
    #[error("caller is not the bound resource")]
    UnauthorizedCaller,

    /// Null resource identifier supplied to bind
    #[error("resource identifier must not be null")]
    InvalidResource,

    /// Verification attempted before any resource was bound
    #[error("authority has no bound resource")]
    NotInitialized,

    /// Authorization was issued for another execution environment
    #[error("domain mismatch: expected {expected}, got {actual}")]
    DomainMismatch {
        /// Domain the authority runs in
        expected: DomainId,
        /// Domain carried by the request
        actual: DomainId,
    },

    /// Authorization identifier was already used (or is in flight)
    #[error("authorization already consumed")]
    AlreadyConsumed,

    /// Signature does not verify under the configured signer
    #[error("invalid authorization signature")]
    InvalidSignature,

    /// Vault holds less than the authorized amount
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Current vault balance
        available: Amount,
        /// Amount the withdrawal asked for
        requested: Amount,
    },

    /// The external value transfer reported failure
    #[error("transfer failed: {reason}")]
    TransferFailed {
        /// Reason reported by the recipient
        reason: String,
    },

    /// Withdraw invoked while another withdraw on the same ledger is in progress
    #[error("reentrant call rejected")]
    ReentrantCall,

    /// Null recipient
    #[error("recipient must not be null")]
    InvalidRecipient,

    /// Zero amount supplied to deposit or withdraw
    #[error("amount must be strictly positive")]
    ZeroAmount,

    /// Signer key is not a usable Ed25519 verifying key
    #[error("invalid signer identity: {message}")]
    InvalidSigner {
        /// Why the key was rejected
        message: String,
    },

    /// Arithmetic on amounts would overflow
    #[error("amount overflow")]
    Overflow,

    /// Durable store failure
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the invalid setting
        message: String,
    },
}

impl WardenError {
    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid signer error
    pub fn invalid_signer(message: impl Into<String>) -> Self {
        Self::InvalidSigner {
            message: message.into(),
        }
    }

    /// Create a transfer failure
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Whether an identical retry could succeed without changing the input.
    ///
    /// Only infrastructure failures qualify; protocol rejections are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Standard Result type for Warden operations
pub type Result<T> = std::result::Result<T, WardenError>;

impl From<std::io::Error> for WardenError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for WardenError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WardenError::DomainMismatch {
            expected: DomainId::new(1),
            actual: DomainId::new(5),
        };
        assert_eq!(err.to_string(), "domain mismatch: expected 1, got 5");
        assert_eq!(
            WardenError::storage("disk full").to_string(),
            "Storage error: disk full"
        );
    }

    #[test]
    fn test_protocol_errors_are_terminal() {
        let terminal = [
            WardenError::AlreadyBound,
            WardenError::Unauthorized,
            WardenError::UnauthorizedCaller,
            WardenError::InvalidResource,
            WardenError::NotInitialized,
            WardenError::AlreadyConsumed,
            WardenError::InvalidSignature,
            WardenError::ReentrantCall,
            WardenError::InvalidRecipient,
            WardenError::ZeroAmount,
            WardenError::transfer_failed("rejected"),
        ];
        assert!(terminal.iter().all(|e| !e.is_retryable()));
        assert!(WardenError::storage("io").is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(
            WardenError::from(io_err),
            WardenError::Storage { .. }
        ));
    }
}
