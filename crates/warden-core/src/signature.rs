//! Ed25519 signer identity and authorization signatures
//!
//! The signer identity is fixed for the lifetime of an authority. Weak
//! (small-order) keys are rejected at construction so that no signature can
//! verify under a degenerate identity.

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::digest::{signing_message, Digest};
use crate::errors::{Result, WardenError};

/// Public identity of the trusted off-line signer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignerIdentity(VerifyingKey);

impl SignerIdentity {
    /// Create from an Ed25519 verifying key, rejecting weak keys
    pub fn new(key: VerifyingKey) -> Result<Self> {
        if key.is_weak() {
            return Err(WardenError::invalid_signer("small-order public key"));
        }
        Ok(Self(key))
    }

    /// Create from the 32-byte compressed encoding
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| WardenError::invalid_signer(e.to_string()))?;
        Self::new(key)
    }

    /// Compressed encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Underlying verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }

    /// Check that `signature` was produced by this signer over the
    /// signed-message envelope of `digest`.
    pub fn verify(&self, digest: &Digest, signature: &AuthorizationSignature) -> Result<()> {
        let message = signing_message(digest);
        self.0
            .verify_strict(&message, &signature.to_dalek())
            .map_err(|_| WardenError::InvalidSignature)
    }
}

impl fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerIdentity({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for SignerIdentity {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| WardenError::invalid_signer(format!("invalid hex: {e}")))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WardenError::invalid_signer("signer key must be 32 bytes"))?;
        Self::from_bytes(&array)
    }
}

impl Serialize for SignerIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SignerIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ed25519 signature over the signed-message envelope of an authorization digest
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationSignature(pub [u8; 64]);

impl AuthorizationSignature {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a byte slice of exactly 64 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 64] = bytes.try_into().map_err(|_| {
            WardenError::serialization(format!(
                "Invalid signature length: expected 64 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Raw bytes
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }

    fn to_dalek(self) -> Signature {
        Signature::from_bytes(&self.0)
    }
}

impl From<Signature> for AuthorizationSignature {
    fn from(sig: Signature) -> Self {
        Self(sig.to_bytes())
    }
}

impl fmt::Debug for AuthorizationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizationSignature({}..)", &hex::encode(self.0)[..16])
    }
}

impl Serialize for AuthorizationSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for AuthorizationSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}
