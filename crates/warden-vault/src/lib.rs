//! Vault ledger for Warden
//!
//! Holds pooled funds, accepts unconditional deposits and releases value only
//! after the bound [`warden_authority::AuthorizationAuthority`] has verified
//! and consumed a signed authorization. Withdrawals are reentrancy-safe and
//! all-or-nothing.

#![allow(clippy::result_large_err)]

mod guard;
/// Ledger state and the withdrawal transaction
pub mod ledger;
/// External transfer seam
pub mod recipient;

pub use ledger::{VaultLedger, VaultSettings, VaultState, WithdrawalReceipt};
pub use recipient::{AccountWallet, Recipient, TransferError};
