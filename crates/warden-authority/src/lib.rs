//! Authorization authority for Warden
//!
//! Owns the trusted signer identity, the one-time vault binding and the
//! replay-protection ledger, and exposes a single verify-and-consume
//! operation to the holder of the bound-vault capability. It depends on nothing else in the protocol.

#![allow(clippy::result_large_err)]

/// Authority and its verification pipeline
pub mod authority;
/// One-time binding state
pub mod binding;
/// Capability held by the bound vault
pub mod capability;
/// Off-line issuance helper
pub mod issuer;
/// Reserved-but-uncommitted consumptions
pub mod staged;

pub use authority::{
    AuthoritySettings, AuthorizationAuthority, ConsumedAuthorization, AUTHORITY_RECORD_KEY,
};
pub use binding::Binding;
pub use capability::BoundVault;
pub use issuer::Issuer;
pub use staged::StagedConsumption;
