//! One-time authority-to-vault binding

use serde::{Deserialize, Serialize};
use warden_core::ResourceId;

/// Which vault, if any, the authority serves
///
/// Transitions exactly once from `Unbound` to `Bound`; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "resource", rename_all = "snake_case")]
pub enum Binding {
    /// No vault bound yet; every verification fails
    #[default]
    Unbound,
    /// Bound to exactly this vault
    Bound(ResourceId),
}

impl Binding {
    /// The bound resource, if any
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Unbound => None,
            Self::Bound(resource) => Some(*resource),
        }
    }

    /// Whether a resource is bound
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }
}
