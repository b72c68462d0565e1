//! External value transfer
//!
//! Paying a recipient hands control to code the vault does not trust. A
//! [`Recipient`] may do anything from inside [`Recipient::receive`], including
//! calling back into the vault that is paying it.

use parking_lot::Mutex;
use warden_core::{AccountId, Amount, ResourceId};

/// Failure reported by a recipient while accepting value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct TransferError {
    reason: String,
}

impl TransferError {
    /// Create a transfer error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Reason given by the recipient
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Destination of a withdrawal
pub trait Recipient {
    /// Account the funds are credited to; must match the signed recipient
    fn account(&self) -> AccountId;

    /// Accept `amount` from the vault `from`. Returning an error aborts the
    /// whole withdrawal.
    fn receive(&self, from: ResourceId, amount: Amount) -> Result<(), TransferError>;
}

/// Plain account that accepts every transfer and tallies what it received
#[derive(Debug)]
pub struct AccountWallet {
    account: AccountId,
    received: Mutex<Amount>,
}

impl AccountWallet {
    /// Wallet for `account` with nothing received
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            received: Mutex::new(Amount::ZERO),
        }
    }

    /// Total received so far
    pub fn received(&self) -> Amount {
        *self.received.lock()
    }
}

impl Recipient for AccountWallet {
    fn account(&self) -> AccountId {
        self.account
    }

    fn receive(&self, _from: ResourceId, amount: Amount) -> Result<(), TransferError> {
        let mut received = self.received.lock();
        *received = received
            .checked_add(amount)
            .map_err(|e| TransferError::new(e.to_string()))?;
        Ok(())
    }
}
