//! Staged consumption
//!
//! A verified authorization whose identifier is reserved but not yet
//! permanently consumed. Exactly one of [`StagedConsumption::commit`],
//! [`StagedConsumption::finalize`] or [`StagedConsumption::abort`] settles it;
//! dropping an unsettled stage aborts.

use warden_core::{AuthorizationRequest, Digest, Result};

use crate::authority::{AuthorizationAuthority, ConsumedAuthorization};

/// Reserved, verified authorization awaiting commit
#[must_use = "an uncommitted stage releases its reservation when dropped"]
#[derive(Debug)]
pub struct StagedConsumption<'a> {
    authority: &'a AuthorizationAuthority,
    request: AuthorizationRequest,
    digest: Digest,
    settled: bool,
}

impl<'a> StagedConsumption<'a> {
    pub(crate) fn new(
        authority: &'a AuthorizationAuthority,
        request: AuthorizationRequest,
        digest: Digest,
    ) -> Self {
        Self {
            authority,
            request,
            digest,
            settled: false,
        }
    }

    /// Verified parameters
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Digest the signature was checked against
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Permanently consume the authorization and emit the consumption
    /// notification. If the consumption cannot be persisted the reservation
    /// is released and nothing is emitted.
    pub fn commit(mut self) -> Result<ConsumedAuthorization> {
        self.settled = true;
        self.authority.commit_reserved(&self.request)?;
        Ok(self.receipt())
    }

    /// Consume the authorization once the effect it authorized has happened
    /// and can no longer be undone.
    ///
    /// Always succeeds: a persistence failure is logged and the id stays
    /// consumed in memory.
    pub fn finalize(mut self) -> ConsumedAuthorization {
        self.settled = true;
        self.authority.settle_reserved(&self.request);
        self.receipt()
    }

    fn receipt(&self) -> ConsumedAuthorization {
        ConsumedAuthorization {
            request: self.request,
            digest: self.digest,
        }
    }

    /// Release the reservation; the authorization stays usable
    pub fn abort(mut self) {
        self.settled = true;
        self.authority
            .release_reserved(&self.request.authorization_id);
    }
}

impl Drop for StagedConsumption<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.authority
                .release_reserved(&self.request.authorization_id);
        }
    }
}
