//! Shared fixtures for vault integration tests

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use warden_authority::{AuthoritySettings, AuthorizationAuthority, BoundVault, Issuer};
use warden_core::{
    AccountId, Amount, AuthorizationId, AuthorizationRequest, DomainId, RecordingSink,
    ResourceId, SignedAuthorization, WardenError,
};
use warden_store::{load_json, MemoryStore, StateStore};
use warden_vault::{VaultLedger, VaultSettings, VaultState};

/// One whole unit in base units
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub const DOMAIN: DomainId = DomainId::new(1);
pub const OWNER: AccountId = AccountId::from_bytes([0x0a; 32]);
pub const VAULT: ResourceId = ResourceId::from_bytes([0x0b; 32]);
pub const ALICE: AccountId = AccountId::from_bytes([0xa1; 32]);
pub const BOB: AccountId = AccountId::from_bytes([0xb0; 32]);
pub const DEPOSITOR: AccountId = AccountId::from_bytes([0xd0; 32]);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("warden=debug")
        .try_init();
}

pub fn issuer(seed: u64) -> Issuer {
    Issuer::new(SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(seed)))
}

pub fn auth_id(n: u8) -> AuthorizationId {
    AuthorizationId::from_bytes([n; 32])
}

/// Capability minted by an unrelated authority that claims `VAULT`
pub fn rogue_capability() -> BoundVault {
    let rogue_owner = AccountId::from_bytes([0xee; 32]);
    let rogue = AuthorizationAuthority::new(
        AuthoritySettings {
            signer: issuer(1).identity().unwrap(),
            owner: rogue_owner,
            domain: DOMAIN,
        },
        Arc::new(RecordingSink::new()),
    );
    rogue.bind(&rogue_owner, VAULT).unwrap()
}

/// Memory store whose writes can be switched off
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl StateStore for FlakyStore {
    fn load(&self, key: &str) -> warden_core::Result<Option<Vec<u8>>> {
        self.inner.load(key)
    }

    fn store(&self, key: &str, value: &[u8]) -> warden_core::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WardenError::storage("disk full"));
        }
        self.inner.store(key, value)
    }

    fn remove(&self, key: &str) -> warden_core::Result<()> {
        self.inner.remove(key)
    }

    fn keys(&self) -> warden_core::Result<Vec<String>> {
        self.inner.keys()
    }
}

/// Bound authority and vault sharing one notification recorder
pub struct Harness {
    pub issuer: Issuer,
    pub authority: Arc<AuthorizationAuthority>,
    pub vault: VaultLedger,
    pub events: Arc<RecordingSink>,
    pub store: Arc<dyn StateStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), DOMAIN)
    }

    /// Vault running in `vault_domain`; the authority always runs in `DOMAIN`
    pub fn with_store(store: Arc<dyn StateStore>, vault_domain: DomainId) -> Self {
        init_tracing();
        let issuer = issuer(1);
        let events = Arc::new(RecordingSink::new());
        let authority = Arc::new(
            AuthorizationAuthority::open(
                AuthoritySettings {
                    signer: issuer.identity().unwrap(),
                    owner: OWNER,
                    domain: DOMAIN,
                },
                store.clone(),
                events.clone(),
            )
            .unwrap(),
        );
        let capability = if authority.binding().is_bound() {
            authority.reattach(&OWNER).unwrap()
        } else {
            authority.bind(&OWNER, VAULT).unwrap()
        };
        let vault = VaultLedger::open(
            VaultSettings {
                resource_id: VAULT,
                domain: vault_domain,
            },
            authority.clone(),
            store.clone(),
            events.clone(),
        )
        .unwrap();
        vault.attach(capability).unwrap();
        events.clear();
        Self {
            issuer,
            authority,
            vault,
            events,
            store,
        }
    }

    /// Authorization for this vault in `DOMAIN`
    pub fn authorize(&self, recipient: AccountId, amount: u128, id: u8) -> SignedAuthorization {
        self.issuer.issue(AuthorizationRequest {
            domain: DOMAIN,
            resource: VAULT,
            recipient,
            amount: Amount::new(amount),
            authorization_id: auth_id(id),
        })
    }

    /// Accounting as last written to the store
    pub fn persisted(&self) -> VaultState {
        load_json(self.store.as_ref(), &format!("vault/{VAULT}"))
            .unwrap()
            .unwrap_or_default()
    }

    pub fn fund(&self, amount: u128) {
        self.vault.deposit(DEPOSITOR, Amount::new(amount)).unwrap();
        self.events.clear();
    }
}
