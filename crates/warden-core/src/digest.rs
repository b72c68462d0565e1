//! Canonical authorization digest
//!
//! The digest is the value an issuer signs and the authority verifies. Both
//! sides must compute it through [`authorization_digest`]; there is no other
//! encoding of an authorization.
//!
//! Layout (all fixed width, so the encoding is injective):
//!
//! ```text
//! u16 BE tag length ‖ tag ‖ domain u64 BE ‖ resource [32] ‖ recipient [32]
//!     ‖ amount u128 BE ‖ authorization id [32]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::{AccountId, Amount, AuthorizationId, DomainId, ResourceId};

/// Fixed protocol tag mixed into every digest
pub const PROTOCOL_TAG: &[u8] = b"warden.withdrawal-authorization.v1";

/// Prefix of the signed-message envelope
///
/// The leading `0x19` byte can never start a canonical digest preimage, which
/// keeps protocol signatures apart from signatures over arbitrary payloads.
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Warden Signed Message:\n32";

/// Length of the signed-message envelope
pub const SIGNED_MESSAGE_LEN: usize = SIGNED_MESSAGE_PREFIX.len() + 32;

/// BLAKE3 digest (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Compute the canonical digest of an authorization
pub fn authorization_digest(
    domain: DomainId,
    resource: &ResourceId,
    recipient: &AccountId,
    amount: Amount,
    authorization_id: &AuthorizationId,
) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(PROTOCOL_TAG.len() as u16).to_be_bytes());
    hasher.update(PROTOCOL_TAG);
    hasher.update(&domain.to_be_bytes());
    hasher.update(resource.as_bytes());
    hasher.update(recipient.as_bytes());
    hasher.update(&amount.to_be_bytes());
    hasher.update(authorization_id.as_bytes());
    Digest(*hasher.finalize().as_bytes())
}

/// Wrap a digest in the signed-message envelope. This, not the bare digest,
/// is what gets signed.
pub fn signing_message(digest: &Digest) -> [u8; SIGNED_MESSAGE_LEN] {
    let mut message = [0u8; SIGNED_MESSAGE_LEN];
    message[..SIGNED_MESSAGE_PREFIX.len()].copy_from_slice(SIGNED_MESSAGE_PREFIX);
    message[SIGNED_MESSAGE_PREFIX.len()..].copy_from_slice(digest.as_bytes());
    message
}
