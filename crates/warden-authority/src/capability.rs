//! Bound-resource capability
//!
//! Proof that its holder is the vault an authority was bound to. Only the
//! authority mints one, at most once per authority instance, and it cannot be
//! cloned. Verification takes the caller's identity from the capability, never
//! from request data.

use warden_core::ResourceId;

/// Unforgeable handle identifying the bound vault to its authority
#[derive(Debug, PartialEq, Eq)]
pub struct BoundVault {
    authority: u64,
    resource: ResourceId,
}

impl BoundVault {
    pub(crate) fn new(authority: u64, resource: ResourceId) -> Self {
        Self {
            authority,
            resource,
        }
    }

    /// Resource this capability speaks for
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Instance tag of the minting authority
    pub(crate) fn authority(&self) -> u64 {
        self.authority
    }
}
