//! Authorization parameters
//!
//! An authorization is never stored as an object. Only its digest and its
//! identifier matter once it has been checked.

use serde::{Deserialize, Serialize};

use crate::digest::{authorization_digest, Digest};
use crate::identifiers::{AccountId, Amount, AuthorizationId, DomainId, ResourceId};
use crate::signature::AuthorizationSignature;

/// Plaintext parameters covered by an authorization signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Execution environment the authorization is valid in
    pub domain: DomainId,
    /// Vault the funds are released from
    pub resource: ResourceId,
    /// Account receiving the funds
    pub recipient: AccountId,
    /// Amount released
    pub amount: Amount,
    /// Single-use identifier chosen by the issuer
    pub authorization_id: AuthorizationId,
}

impl AuthorizationRequest {
    /// Canonical digest of these parameters
    pub fn digest(&self) -> Digest {
        authorization_digest(
            self.domain,
            &self.resource,
            &self.recipient,
            self.amount,
            &self.authorization_id,
        )
    }
}

/// Authorization as handed out-of-band to whoever submits the withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
    /// Signed parameters
    pub request: AuthorizationRequest,
    /// Signature over the signed-message envelope of the request digest
    pub signature: AuthorizationSignature,
}
