//! Off-line authorization issuance
//!
//! The issuer computes the digest exactly as the authority does and signs its
//! signed-message envelope. The resulting [`SignedAuthorization`] is handed
//! out-of-band to whoever submits the withdrawal.

use ed25519_dalek::{Signature, Signer, SigningKey};
use warden_core::{
    signing_message, AuthorizationRequest, AuthorizationSignature, Digest, Result,
    SignedAuthorization, SignerIdentity,
};

/// Holder of the signer's private key
pub struct Issuer {
    key: SigningKey,
}

impl Issuer {
    /// Wrap a signing key
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Public identity an authority must be configured with
    pub fn identity(&self) -> Result<SignerIdentity> {
        SignerIdentity::new(self.key.verifying_key())
    }

    /// Sign a precomputed authorization digest
    pub fn sign_digest(&self, digest: &Digest) -> AuthorizationSignature {
        let signature: Signature = self.key.sign(&signing_message(digest));
        signature.into()
    }

    /// Issue a signed authorization for `request`
    pub fn issue(&self, request: AuthorizationRequest) -> SignedAuthorization {
        SignedAuthorization {
            request,
            signature: self.sign_digest(&request.digest()),
        }
    }
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("verifying_key", &self.key.verifying_key())
            .finish_non_exhaustive()
    }
}
