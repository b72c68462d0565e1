//! Authorization authority
//!
//! The sole arbiter of whether a withdrawal is permitted and the sole owner of
//! the replay-protection ledger. Verification and consumption happen inside one
//! critical section over [`AuthorityState`]; no caller can observe an
//! authorization that has been verified but not yet reserved.
//!
//! Only the holder of the [`BoundVault`] minted by [`AuthorizationAuthority::bind`]
//! (or [`AuthorizationAuthority::reattach`] after a restart) can consume
//! authorizations.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use warden_core::{
    AccountId, AuthorizationId, AuthorizationRequest, AuthorizationSignature, Digest, DomainId,
    EventSink, LedgerEvent, ResourceId, Result, SignerIdentity, WardenConfig, WardenError,
};
use warden_store::{load_json, store_json, MemoryStore, StateStore};

use crate::binding::Binding;
use crate::capability::BoundVault;
use crate::staged::StagedConsumption;

/// Store key of the authority record
pub const AUTHORITY_RECORD_KEY: &str = "authority";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Construction parameters, fixed for the lifetime of the authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthoritySettings {
    /// Trusted off-line signer
    pub signer: SignerIdentity,
    /// Administrative owner, the only identity allowed to bind
    pub owner: AccountId,
    /// Execution environment this authority runs in
    pub domain: DomainId,
}

impl AuthoritySettings {
    /// Extract authority settings from deployment configuration
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            signer: config.authority.signer,
            owner: config.authority.owner,
            domain: config.domain_id,
        }
    }
}

/// Mutable authority state guarded by the critical section
#[derive(Debug, Default)]
pub(crate) struct AuthorityState {
    pub(crate) binding: Binding,
    /// Permanently consumed identifiers
    pub(crate) consumed: BTreeSet<AuthorizationId>,
    /// Identifiers verified by an in-flight withdrawal, not yet committed
    pub(crate) reserved: BTreeSet<AuthorizationId>,
    /// Whether this instance has handed out its [`BoundVault`]
    pub(crate) capability_issued: bool,
}

impl AuthorityState {
    fn is_spent(&self, id: &AuthorizationId) -> bool {
        self.consumed.contains(id) || self.reserved.contains(id)
    }
}

/// Persisted form of the authority
#[derive(Debug, Serialize, Deserialize)]
struct AuthorityRecord {
    signer: SignerIdentity,
    owner: AccountId,
    domain: DomainId,
    binding: Binding,
    consumed: BTreeSet<AuthorizationId>,
}

/// Receipt for a committed consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumedAuthorization {
    /// Parameters that were authorized, with `resource` set to the caller
    pub request: AuthorizationRequest,
    /// Digest the signature was checked against
    pub digest: Digest,
}

/// Verifies signed withdrawal authorizations and consumes them exactly once
pub struct AuthorizationAuthority {
    instance: u64,
    settings: AuthoritySettings,
    state: Mutex<AuthorityState>,
    store: Arc<dyn StateStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for AuthorizationAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationAuthority")
            .field("settings", &self.settings)
            .field("binding", &self.binding())
            .finish_non_exhaustive()
    }
}

impl AuthorizationAuthority {
    /// Create a fresh authority backed by volatile memory
    pub fn new(settings: AuthoritySettings, events: Arc<dyn EventSink>) -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            settings,
            state: Mutex::new(AuthorityState::default()),
            store: Arc::new(MemoryStore::new()),
            events,
        }
    }

    /// Open an authority over a durable store, restoring any persisted binding
    /// and consumed set.
    ///
    /// A persisted record written under a different signer, owner or domain
    /// is rejected: none of those may change for the lifetime of the authority.
    pub fn open(
        settings: AuthoritySettings,
        store: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let mut state = AuthorityState::default();

        if let Some(record) = load_json::<AuthorityRecord>(store.as_ref(), AUTHORITY_RECORD_KEY)? {
            if record.signer != settings.signer {
                return Err(WardenError::invalid_signer(format!(
                    "persisted signer {} differs from configured signer {}",
                    record.signer, settings.signer
                )));
            }
            if record.owner != settings.owner || record.domain != settings.domain {
                return Err(WardenError::config(
                    "persisted authority owner or domain differs from configuration",
                ));
            }
            state.binding = record.binding;
            state.consumed = record.consumed;
            info!(
                binding = ?state.binding,
                consumed = state.consumed.len(),
                "restored authority state"
            );
        }

        Ok(Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            settings,
            state: Mutex::new(state),
            store,
            events,
        })
    }

    /// Trusted signer
    pub fn signer(&self) -> SignerIdentity {
        self.settings.signer
    }

    /// Administrative owner
    pub fn owner(&self) -> AccountId {
        self.settings.owner
    }

    /// Execution environment
    pub fn domain(&self) -> DomainId {
        self.settings.domain
    }

    /// Current binding
    pub fn binding(&self) -> Binding {
        self.state.lock().binding
    }

    /// Whether `id` has been permanently consumed
    pub fn is_consumed(&self, id: &AuthorizationId) -> bool {
        self.state.lock().consumed.contains(id)
    }

    /// Number of permanently consumed authorizations
    pub fn consumed_count(&self) -> usize {
        self.state.lock().consumed.len()
    }

    /// Digest an issuer must sign for `request`; identical to what
    /// verification computes.
    pub fn authorization_digest(&self, request: &AuthorizationRequest) -> Digest {
        request.digest()
    }

    /// Bind the authority to its vault. Callable once, by the owner only.
    ///
    /// Returns the capability the vault presents on every verification.
    pub fn bind(&self, caller: &AccountId, resource: ResourceId) -> Result<BoundVault> {
        if *caller != self.settings.owner {
            warn!(%caller, "bind rejected: caller is not the owner");
            return Err(WardenError::Unauthorized);
        }

        let mut state = self.state.lock();
        if state.binding.is_bound() {
            warn!(%resource, "bind rejected: already bound");
            return Err(WardenError::AlreadyBound);
        }
        if resource.is_null() {
            warn!("bind rejected: null resource");
            return Err(WardenError::InvalidResource);
        }

        state.binding = Binding::Bound(resource);
        if let Err(e) = self.persist(&state) {
            state.binding = Binding::Unbound;
            return Err(e);
        }
        state.capability_issued = true;
        drop(state);

        info!(%resource, "authority bound");
        self.events.emit(LedgerEvent::ResourceBound {
            resource_id: resource,
        });
        Ok(BoundVault::new(self.instance, resource))
    }

    /// Hand the capability for a binding restored from the store back to the
    /// owner. Works once per instance and never on a binding made by this
    /// instance, which already returned its capability from [`Self::bind`].
    pub fn reattach(&self, caller: &AccountId) -> Result<BoundVault> {
        if *caller != self.settings.owner {
            warn!(%caller, "reattach rejected: caller is not the owner");
            return Err(WardenError::Unauthorized);
        }

        let mut state = self.state.lock();
        let resource = state.binding.resource().ok_or(WardenError::NotInitialized)?;
        if state.capability_issued {
            warn!(%resource, "reattach rejected: capability already issued");
            return Err(WardenError::AlreadyBound);
        }
        state.capability_issued = true;
        drop(state);

        info!(%resource, "bound resource reattached");
        Ok(BoundVault::new(self.instance, resource))
    }

    /// Verify `signature` over `request` and permanently consume its
    /// authorization identifier on behalf of `caller`.
    ///
    /// `request.resource` must name the resource `caller` speaks for; the
    /// digest is computed over it, so a signature issued for another vault
    /// never verifies here. Nothing changes unless the consumption is also
    /// persisted.
    pub fn verify_and_consume(
        &self,
        caller: &BoundVault,
        request: &AuthorizationRequest,
        signature: &AuthorizationSignature,
    ) -> Result<ConsumedAuthorization> {
        self.stage(caller, request, signature)?.commit()
    }

    /// Run every verification check and reserve the authorization identifier
    /// without committing it.
    ///
    /// Checks, first failure wins:
    /// 1. a resource is bound (`NotInitialized`)
    /// 2. `caller` was minted by this authority for the bound resource, and
    ///    `request.resource` names that resource (`UnauthorizedCaller`)
    /// 3. the request domain is this authority's domain (`DomainMismatch`)
    /// 4. the identifier is neither consumed nor reserved (`AlreadyConsumed`)
    /// 5. the signature verifies under the signer (`InvalidSignature`)
    ///
    /// A reserved identifier is treated as consumed by every later check.
    /// Commit the returned [`StagedConsumption`] to make it permanent; dropping
    /// it releases the reservation and leaves the consumed set untouched.
    pub fn stage(
        &self,
        caller: &BoundVault,
        request: &AuthorizationRequest,
        signature: &AuthorizationSignature,
    ) -> Result<StagedConsumption<'_>> {
        let mut state = self.state.lock();
        let digest = match self.check(&state, caller, request, signature) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(
                    authorization_id = %request.authorization_id,
                    resource = %request.resource,
                    error = %e,
                    "authorization rejected"
                );
                return Err(e);
            }
        };
        state.reserved.insert(request.authorization_id);
        debug!(authorization_id = %request.authorization_id, "authorization reserved");
        Ok(StagedConsumption::new(self, *request, digest))
    }

    fn check(
        &self,
        state: &AuthorityState,
        caller: &BoundVault,
        request: &AuthorizationRequest,
        signature: &AuthorizationSignature,
    ) -> Result<Digest> {
        let bound = state.binding.resource().ok_or(WardenError::NotInitialized)?;
        if caller.authority() != self.instance
            || caller.resource() != bound
            || request.resource != bound
        {
            return Err(WardenError::UnauthorizedCaller);
        }
        if request.domain != self.settings.domain {
            return Err(WardenError::DomainMismatch {
                expected: self.settings.domain,
                actual: request.domain,
            });
        }
        if state.is_spent(&request.authorization_id) {
            return Err(WardenError::AlreadyConsumed);
        }
        let digest = request.digest();
        self.settings.signer.verify(&digest, signature)?;
        Ok(digest)
    }

    /// Move a reservation into the consumed set and persist it. A failed
    /// write releases the reservation and leaves the consumed set untouched.
    pub(crate) fn commit_reserved(&self, request: &AuthorizationRequest) -> Result<()> {
        let id = request.authorization_id;
        let mut state = self.state.lock();
        state.reserved.remove(&id);
        state.consumed.insert(id);
        if let Err(e) = self.persist(&state) {
            state.consumed.remove(&id);
            warn!(authorization_id = %id, error = %e, "consumption not persisted, released");
            return Err(e);
        }
        drop(state);

        self.announce_consumed(request);
        Ok(())
    }

    /// Move a reservation into the consumed set after an irreversible effect.
    ///
    /// The id stays consumed in memory even when it cannot be persisted: this
    /// process must never accept it again.
    pub(crate) fn settle_reserved(&self, request: &AuthorizationRequest) {
        let id = request.authorization_id;
        let mut state = self.state.lock();
        state.reserved.remove(&id);
        state.consumed.insert(id);
        if let Err(e) = self.persist(&state) {
            error!(authorization_id = %id, error = %e, "failed to persist consumed authorization");
        }
        drop(state);

        self.announce_consumed(request);
    }

    fn announce_consumed(&self, request: &AuthorizationRequest) {
        let id = request.authorization_id;
        info!(
            authorization_id = %id,
            recipient = %request.recipient,
            amount = %request.amount,
            "authorization consumed"
        );
        self.events.emit(LedgerEvent::AuthorizationConsumed {
            authorization_id: id,
            resource: request.resource,
            recipient: request.recipient,
            amount: request.amount,
        });
    }

    /// Drop a reservation without consuming it
    pub(crate) fn release_reserved(&self, id: &AuthorizationId) {
        if self.state.lock().reserved.remove(id) {
            debug!(authorization_id = %id, "authorization reservation released");
        }
    }

    fn persist(&self, state: &AuthorityState) -> Result<()> {
        let record = AuthorityRecord {
            signer: self.settings.signer,
            owner: self.settings.owner,
            domain: self.settings.domain,
            binding: state.binding,
            consumed: state.consumed.clone(),
        };
        store_json(self.store.as_ref(), AUTHORITY_RECORD_KEY, &record)
    }
}
