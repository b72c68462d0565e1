//! Core types for Warden
//!
//! Warden releases pooled funds only against single-use permissions signed
//! off-line by a trusted authority. This crate holds what both halves of the
//! protocol share: identifiers, the canonical digest, the signer identity, the
//! error taxonomy, notifications and configuration.

/// Authorization parameters and signed hand-off form
pub mod authorization;
/// Deployment configuration
pub mod config;
/// Canonical digest and signed-message envelope
pub mod digest;
/// Unified error handling
pub mod errors;
/// Ledger notifications and sinks
pub mod events;
/// Fixed-width identifiers and amounts
pub mod identifiers;
/// Signer identity and signatures
pub mod signature;

pub use authorization::{AuthorizationRequest, SignedAuthorization};
pub use config::{AuthorityConfig, StorageBackend, StorageConfig, VaultConfig, WardenConfig};
pub use digest::{authorization_digest, signing_message, Digest, PROTOCOL_TAG};
pub use errors::{Result, WardenError};
pub use events::{EventSink, FanoutSink, LedgerEvent, RecordingSink, TracingSink};
pub use identifiers::{AccountId, Amount, AuthorizationId, DomainId, ResourceId};
pub use signature::{AuthorizationSignature, SignerIdentity};
