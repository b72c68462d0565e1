//! Vault ledger
//!
//! Custody of pooled funds. Deposits are unconditional; withdrawals run as a
//! transaction:
//!
//! 1. verify and reserve the authorization with the authority, presenting the
//!    vault's [`BoundVault`] capability
//! 2. check the balance covers the amount
//! 3. apply the accounting mutation as a pending debit
//! 4. pay the recipient (untrusted code runs here)
//! 5. on success persist the accounting, then consume the authorization; on
//!    failure undo step 3 and release the reservation
//!
//! The accounting mutation always precedes the payout, so anything the
//! recipient observes from inside step 4 already reflects the withdrawal.
//! The store only ever sees committed accounting: a pending debit is left out
//! of anything persisted while the payout runs.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use warden_authority::{AuthorizationAuthority, BoundVault};
use warden_core::{
    AccountId, Amount, AuthorizationId, AuthorizationRequest, AuthorizationSignature, Digest,
    DomainId, EventSink, LedgerEvent, ResourceId, Result, WardenConfig, WardenError,
};
use warden_store::{load_json, store_json, MemoryStore, StateStore};

use crate::guard::ReentrancyGuard;
use crate::recipient::Recipient;

/// Construction parameters of a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultSettings {
    /// Identifier of this vault; the authority must be bound to it
    pub resource_id: ResourceId,
    /// Execution environment the vault runs in
    pub domain: DomainId,
}

impl VaultSettings {
    /// Extract vault settings from deployment configuration
    pub fn from_config(config: &WardenConfig) -> Self {
        Self {
            resource_id: config.vault.resource_id,
            domain: config.domain_id,
        }
    }
}

/// Balance and withdrawal accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    /// Funds currently held
    pub balance: Amount,
    /// Sum of all successful withdrawals
    pub total_withdrawn: Amount,
    /// Successful withdrawals per recipient
    pub withdrawn_by_recipient: BTreeMap<AccountId, Amount>,
}

impl VaultState {
    /// Amount withdrawn to `recipient` so far
    pub fn withdrawn_by(&self, recipient: &AccountId) -> Amount {
        self.withdrawn_by_recipient
            .get(recipient)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Debit the balance and record the withdrawal. Leaves the state
    /// untouched on error.
    fn apply_withdrawal(&mut self, recipient: &AccountId, amount: Amount) -> Result<()> {
        if self.balance < amount {
            return Err(WardenError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }
        let balance = self.balance.checked_sub(amount)?;
        let total = self.total_withdrawn.checked_add(amount)?;
        let per_recipient = self.withdrawn_by(recipient).checked_add(amount)?;

        self.balance = balance;
        self.total_withdrawn = total;
        self.withdrawn_by_recipient.insert(*recipient, per_recipient);
        Ok(())
    }

    /// Exact inverse of [`Self::apply_withdrawal`]
    fn revert_withdrawal(&mut self, recipient: &AccountId, amount: Amount) -> Result<()> {
        let balance = self.balance.checked_add(amount)?;
        let total = self.total_withdrawn.checked_sub(amount)?;
        let per_recipient = self.withdrawn_by(recipient).checked_sub(amount)?;

        self.balance = balance;
        self.total_withdrawn = total;
        if per_recipient.is_zero() {
            self.withdrawn_by_recipient.remove(recipient);
        } else {
            self.withdrawn_by_recipient.insert(*recipient, per_recipient);
        }
        Ok(())
    }
}

/// Debit applied in memory while its payout is running
#[derive(Debug, Clone, Copy)]
struct PendingDebit {
    recipient: AccountId,
    amount: Amount,
}

/// Live accounting plus the debit not yet committed
#[derive(Debug, Default)]
struct Ledger {
    state: VaultState,
    pending: Option<PendingDebit>,
}

impl Ledger {
    fn new(state: VaultState) -> Self {
        Self {
            state,
            pending: None,
        }
    }

    /// Accounting as it stands without the pending debit
    fn committed(&self) -> Result<VaultState> {
        let mut state = self.state.clone();
        if let Some(debit) = self.pending {
            state.revert_withdrawal(&debit.recipient, debit.amount)?;
        }
        Ok(state)
    }
}

/// Result of a successful withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    /// Account that was paid
    pub recipient: AccountId,
    /// Amount paid
    pub amount: Amount,
    /// Consumed authorization
    pub authorization_id: AuthorizationId,
    /// Digest the authorization signature covered
    pub digest: Digest,
    /// Vault balance once the withdrawal completed
    pub balance_after: Amount,
}

/// Pooled-fund vault gated by an [`AuthorizationAuthority`]
pub struct VaultLedger {
    settings: VaultSettings,
    authority: Arc<AuthorizationAuthority>,
    capability: Mutex<Option<BoundVault>>,
    ledger: Mutex<Ledger>,
    guard: ReentrancyGuard,
    store: Arc<dyn StateStore>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for VaultLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultLedger")
            .field("settings", &self.settings)
            .field("balance", &self.balance())
            .finish_non_exhaustive()
    }
}

impl VaultLedger {
    /// Create an empty vault backed by volatile memory. It cannot withdraw
    /// until [`Self::attach`] hands it its capability.
    pub fn new(
        settings: VaultSettings,
        authority: Arc<AuthorizationAuthority>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            settings,
            authority,
            capability: Mutex::new(None),
            ledger: Mutex::new(Ledger::default()),
            guard: ReentrancyGuard::default(),
            store: Arc::new(MemoryStore::new()),
            events,
        }
    }

    /// Open a vault over a durable store, restoring persisted accounting
    pub fn open(
        settings: VaultSettings,
        authority: Arc<AuthorizationAuthority>,
        store: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let state = load_json::<VaultState>(store.as_ref(), &Self::record_key(&settings))?
            .unwrap_or_default();
        info!(
            resource = %settings.resource_id,
            balance = %state.balance,
            "opened vault"
        );
        Ok(Self {
            settings,
            authority,
            capability: Mutex::new(None),
            ledger: Mutex::new(Ledger::new(state)),
            guard: ReentrancyGuard::default(),
            store,
            events,
        })
    }

    fn record_key(settings: &VaultSettings) -> String {
        format!("vault/{}", settings.resource_id)
    }

    /// Install the capability returned by binding the authority to this vault
    pub fn attach(&self, capability: BoundVault) -> Result<()> {
        let mut slot = self.capability.lock();
        if slot.is_some() {
            warn!(resource = %self.settings.resource_id, "attach rejected: capability already held");
            return Err(WardenError::AlreadyBound);
        }
        info!(
            resource = %self.settings.resource_id,
            bound = %capability.resource(),
            "capability attached"
        );
        *slot = Some(capability);
        Ok(())
    }

    /// Whether a capability has been attached
    pub fn is_attached(&self) -> bool {
        self.capability.lock().is_some()
    }

    /// Identifier of this vault
    pub fn resource_id(&self) -> ResourceId {
        self.settings.resource_id
    }

    /// Authority gating withdrawals
    pub fn authority(&self) -> &Arc<AuthorizationAuthority> {
        &self.authority
    }

    /// Current balance
    pub fn balance(&self) -> Amount {
        self.ledger.lock().state.balance
    }

    /// Sum of all successful withdrawals
    pub fn total_withdrawn(&self) -> Amount {
        self.ledger.lock().state.total_withdrawn
    }

    /// Amount withdrawn to `recipient` so far
    pub fn withdrawn_by(&self, recipient: &AccountId) -> Amount {
        self.ledger.lock().state.withdrawn_by(recipient)
    }

    /// Snapshot of the live accounting, including a debit whose payout is
    /// still running
    pub fn state(&self) -> VaultState {
        self.ledger.lock().state.clone()
    }

    /// Accept `amount` from `source`. No authorization required.
    pub fn deposit(&self, source: AccountId, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(WardenError::ZeroAmount);
        }

        let mut ledger = self.ledger.lock();
        let previous = ledger.state.balance;
        ledger.state.balance = previous.checked_add(amount)?;
        if let Err(e) = self.persist(&ledger) {
            ledger.state.balance = previous;
            return Err(e);
        }
        let balance = ledger.state.balance;
        drop(ledger);

        info!(%source, %amount, %balance, "deposit accepted");
        self.events.emit(LedgerEvent::Deposited { source, amount });
        Ok(balance)
    }

    /// Release `amount` to `recipient` against a signed authorization.
    ///
    /// Anyone may submit; the signature, not the submitter, authorizes the
    /// transfer. Fails with [`WardenError::ReentrantCall`] if invoked while
    /// another withdrawal on this vault is in progress, including from inside
    /// the recipient's own `receive`.
    ///
    /// Fails with [`WardenError::NotInitialized`] until a capability is
    /// attached. Once the recipient has accepted the funds the call succeeds
    /// even if the resulting state cannot be persisted; the failure is
    /// logged.
    pub fn withdraw(
        &self,
        recipient: &dyn Recipient,
        amount: Amount,
        authorization_id: AuthorizationId,
        signature: &AuthorizationSignature,
    ) -> Result<WithdrawalReceipt> {
        let result = self.try_withdraw(recipient, amount, authorization_id, signature);
        if let Err(e) = &result {
            warn!(
                resource = %self.settings.resource_id,
                %authorization_id,
                %amount,
                error = %e,
                "withdrawal rejected"
            );
        }
        result
    }

    fn try_withdraw(
        &self,
        recipient: &dyn Recipient,
        amount: Amount,
        authorization_id: AuthorizationId,
        signature: &AuthorizationSignature,
    ) -> Result<WithdrawalReceipt> {
        let _entered = self.guard.enter()?;

        let account = recipient.account();
        if account.is_null() {
            return Err(WardenError::InvalidRecipient);
        }
        if amount.is_zero() {
            return Err(WardenError::ZeroAmount);
        }

        let request = AuthorizationRequest {
            domain: self.settings.domain,
            resource: self.settings.resource_id,
            recipient: account,
            amount,
            authorization_id,
        };
        let capability = self.capability.lock();
        let caller = capability.as_ref().ok_or(WardenError::NotInitialized)?;
        // Any early return from here on drops `staged`, releasing the
        // reservation.
        let staged = self.authority.stage(caller, &request, signature)?;
        drop(capability);
        let balance_after = self.debit(&account, amount)?;

        if let Err(e) = recipient.receive(self.settings.resource_id, amount) {
            self.credit_back(&account, amount);
            staged.abort();
            return Err(WardenError::transfer_failed(e.reason()));
        }

        // Funds have moved: from here on the withdrawal succeeds.
        self.commit_debit();
        let consumed = staged.finalize();

        info!(
            resource = %self.settings.resource_id,
            recipient = %account,
            %amount,
            %authorization_id,
            "withdrawal completed"
        );
        self.events.emit(LedgerEvent::Withdrawal {
            recipient: account,
            amount,
            authorization_id,
        });

        Ok(WithdrawalReceipt {
            recipient: account,
            amount,
            authorization_id,
            digest: consumed.digest,
            balance_after,
        })
    }

    /// Check funds and apply the withdrawal accounting in memory as a
    /// pending debit
    fn debit(&self, recipient: &AccountId, amount: Amount) -> Result<Amount> {
        let mut ledger = self.ledger.lock();
        ledger.state.apply_withdrawal(recipient, amount)?;
        ledger.pending = Some(PendingDebit {
            recipient: *recipient,
            amount,
        });
        Ok(ledger.state.balance)
    }

    /// Make the pending debit part of the committed accounting and persist it
    fn commit_debit(&self) {
        let mut ledger = self.ledger.lock();
        ledger.pending = None;
        if let Err(e) = self.persist(&ledger) {
            error!(
                resource = %self.settings.resource_id,
                error = %e,
                "failed to persist accounting after payout"
            );
        }
    }

    /// Undo [`Self::debit`] after a failed payout.
    ///
    /// Applied as an inverse rather than a snapshot restore so that deposits
    /// made while the payout was running are kept. Nothing is persisted: the
    /// store never saw the debit.
    fn credit_back(&self, recipient: &AccountId, amount: Amount) {
        let mut ledger = self.ledger.lock();
        ledger.pending = None;
        if let Err(e) = ledger.state.revert_withdrawal(recipient, amount) {
            error!(%recipient, %amount, error = %e, "failed to roll back withdrawal accounting");
        }
    }

    fn persist(&self, ledger: &Ledger) -> Result<()> {
        store_json(
            self.store.as_ref(),
            &Self::record_key(&self.settings),
            &ledger.committed()?,
        )
    }
}
