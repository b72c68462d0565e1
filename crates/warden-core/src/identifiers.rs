//! Core identifier types used across Warden
//!
//! All identifiers are fixed width so that the canonical digest encoding never
//! needs length prefixes. The all-zero value of each 32-byte identifier is the
//! null sentinel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::WardenError;

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Null sentinel
            pub const NULL: Self = Self([0u8; 32]);

            /// Create from raw bytes
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Whether this is the null sentinel
            pub fn is_null(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Lowercase hex form
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), &hex::encode(self.0)[..12])
            }
        }

        impl FromStr for $name {
            type Err = WardenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| {
                    WardenError::serialization(format!(concat!("invalid ", $label, " hex: {}"), e))
                })?;
                let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
                    WardenError::serialization(format!(
                        concat!($label, " must be 32 bytes, got {}"),
                        v.len()
                    ))
                })?;
                Ok(Self(array))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_id!(
    /// Identifier of a fund-holding resource (a vault instance)
    ResourceId,
    "ResourceId"
);

fixed_id!(
    /// Identifier of an external account: recipients, depositors, owners
    AccountId,
    "AccountId"
);

fixed_id!(
    /// Opaque 256-bit value chosen by the issuer to make an authorization single-use
    AuthorizationId,
    "AuthorizationId"
);

/// Execution-environment identifier
///
/// A signature produced for one domain must never be accepted in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(pub u64);

impl DomainId {
    /// Create a domain identifier
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Inner value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Canonical 8-byte big-endian encoding
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount of value in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Create an amount from base units
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Base units
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Canonical 16-byte big-endian encoding
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Addition that fails on overflow
    pub fn checked_add(self, other: Self) -> Result<Self, WardenError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(WardenError::Overflow)
    }

    /// Subtraction that fails on underflow
    pub fn checked_sub(self, other: Self) -> Result<Self, WardenError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(WardenError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}
