//! Deposit and withdrawal behaviour of the vault ledger

mod common;

use assert_matches::assert_matches;
use std::sync::Arc;

use common::*;
use warden_authority::{AuthoritySettings, AuthorizationAuthority};
use warden_core::{Amount, DomainId, LedgerEvent, RecordingSink, ResourceId, WardenError};
use warden_store::MemoryStore;
use warden_vault::{
    AccountWallet, Recipient, TransferError, VaultLedger, VaultSettings, VaultState,
};

/// Recipient whose account refuses every transfer
struct RejectingRecipient(warden_core::AccountId);

impl Recipient for RejectingRecipient {
    fn account(&self) -> warden_core::AccountId {
        self.0
    }

    fn receive(&self, _from: ResourceId, _amount: Amount) -> Result<(), TransferError> {
        Err(TransferError::new("account closed"))
    }
}

#[test]
fn deposit_credits_balance_and_notifies_once() {
    let h = Harness::new();

    let balance = h.vault.deposit(DEPOSITOR, Amount::new(250)).unwrap();
    assert_eq!(balance, Amount::new(250));
    assert_eq!(h.vault.balance(), Amount::new(250));
    assert_eq!(
        h.events.events(),
        vec![LedgerEvent::Deposited {
            source: DEPOSITOR,
            amount: Amount::new(250),
        }]
    );

    h.vault.deposit(BOB, Amount::new(50)).unwrap();
    assert_eq!(h.vault.balance(), Amount::new(300));
    assert_eq!(h.events.len(), 2);
}

#[test]
fn zero_deposit_rejected() {
    let h = Harness::new();
    assert_eq!(
        h.vault.deposit(DEPOSITOR, Amount::ZERO),
        Err(WardenError::ZeroAmount)
    );
    assert!(h.events.is_empty());
}

#[test]
fn full_withdrawal_scenario() {
    let h = Harness::new();
    let one_and_half = UNIT + UNIT / 2;
    h.fund(one_and_half);

    let alice = AccountWallet::new(ALICE);
    let signed = h.authorize(ALICE, one_and_half, 0xaa);

    let receipt = h
        .vault
        .withdraw(
            &alice,
            Amount::new(one_and_half),
            signed.request.authorization_id,
            &signed.signature,
        )
        .unwrap();
    assert_eq!(receipt.balance_after, Amount::ZERO);
    assert_eq!(receipt.digest, signed.request.digest());
    assert_eq!(h.vault.balance(), Amount::ZERO);
    assert_eq!(alice.received(), Amount::new(one_and_half));
    assert_eq!(h.vault.withdrawn_by(&ALICE), Amount::new(one_and_half));
    assert_eq!(h.vault.total_withdrawn(), Amount::new(one_and_half));
    assert!(h.authority.is_consumed(&auth_id(0xaa)));
    assert_eq!(
        h.events.events(),
        vec![
            LedgerEvent::AuthorizationConsumed {
                authorization_id: auth_id(0xaa),
                resource: VAULT,
                recipient: ALICE,
                amount: Amount::new(one_and_half),
            },
            LedgerEvent::Withdrawal {
                recipient: ALICE,
                amount: Amount::new(one_and_half),
                authorization_id: auth_id(0xaa),
            },
        ]
    );

    // Identical resubmission after refunding the vault.
    h.fund(one_and_half);
    let before = h.vault.state();
    assert_eq!(
        h.vault
            .withdraw(
                &alice,
                Amount::new(one_and_half),
                auth_id(0xaa),
                &signed.signature
            )
            .unwrap_err(),
        WardenError::AlreadyConsumed
    );
    assert_eq!(h.vault.state(), before);
    assert!(h.events.is_empty());

    // Same tuple signed by someone else.
    let forged = issuer(99).issue(signed.request);
    assert_eq!(
        h.vault
            .withdraw(
                &alice,
                Amount::new(one_and_half),
                auth_id(0xaa),
                &forged.signature
            )
            .unwrap_err(),
        WardenError::InvalidSignature
    );
}

#[test]
fn submitter_need_not_be_recipient() {
    let h = Harness::new();
    h.fund(100);
    let signed = h.authorize(ALICE, 40, 1);

    // Anyone holding the authorization may submit it; funds still go to Alice.
    let alice = AccountWallet::new(ALICE);
    h.vault
        .withdraw(&alice, Amount::new(40), auth_id(1), &signed.signature)
        .unwrap();
    assert_eq!(h.vault.withdrawn_by(&ALICE), Amount::new(40));
    assert_eq!(h.vault.withdrawn_by(&BOB), Amount::ZERO);
}

#[test]
fn redirected_or_resized_withdrawal_rejected() {
    let h = Harness::new();
    h.fund(1_000);
    let signed = h.authorize(ALICE, 100, 2);

    let bob = AccountWallet::new(BOB);
    assert_eq!(
        h.vault
            .withdraw(&bob, Amount::new(100), auth_id(2), &signed.signature)
            .unwrap_err(),
        WardenError::InvalidSignature
    );

    let alice = AccountWallet::new(ALICE);
    assert_eq!(
        h.vault
            .withdraw(&alice, Amount::new(101), auth_id(2), &signed.signature)
            .unwrap_err(),
        WardenError::InvalidSignature
    );
    assert_eq!(
        h.vault
            .withdraw(&alice, Amount::new(100), auth_id(3), &signed.signature)
            .unwrap_err(),
        WardenError::InvalidSignature
    );

    assert_eq!(h.vault.balance(), Amount::new(1_000));
    assert_eq!(bob.received(), Amount::ZERO);
    assert!(!h.authority.is_consumed(&auth_id(2)));
    assert!(h.events.is_empty());
}

#[test]
fn input_validation_precedes_verification() {
    let h = Harness::new();
    h.fund(100);
    let signed = h.authorize(ALICE, 10, 4);

    let nobody = AccountWallet::new(warden_core::AccountId::NULL);
    assert_eq!(
        h.vault
            .withdraw(&nobody, Amount::new(10), auth_id(4), &signed.signature)
            .unwrap_err(),
        WardenError::InvalidRecipient
    );
    let alice = AccountWallet::new(ALICE);
    assert_eq!(
        h.vault
            .withdraw(&alice, Amount::ZERO, auth_id(4), &signed.signature)
            .unwrap_err(),
        WardenError::ZeroAmount
    );
    assert!(!h.authority.is_consumed(&auth_id(4)));
}

#[test]
fn insufficient_funds_leaves_authorization_usable() {
    let h = Harness::new();
    h.fund(10);
    let signed = h.authorize(ALICE, 25, 5);
    let alice = AccountWallet::new(ALICE);

    assert_matches!(
        h.vault
            .withdraw(&alice, Amount::new(25), auth_id(5), &signed.signature),
        Err(WardenError::InsufficientFunds { available, requested })
            if available == Amount::new(10) && requested == Amount::new(25)
    );
    assert!(!h.authority.is_consumed(&auth_id(5)));
    assert_eq!(h.vault.balance(), Amount::new(10));
    assert!(h.events.is_empty());

    h.fund(15);
    h.vault
        .withdraw(&alice, Amount::new(25), auth_id(5), &signed.signature)
        .unwrap();
    assert_eq!(h.vault.balance(), Amount::ZERO);
}

#[test]
fn failed_transfer_rolls_back_everything() {
    let h = Harness::new();
    h.fund(500);
    let signed = h.authorize(ALICE, 200, 6);
    let before = h.vault.state();

    let closed = RejectingRecipient(ALICE);
    assert_matches!(
        h.vault
            .withdraw(&closed, Amount::new(200), auth_id(6), &signed.signature),
        Err(WardenError::TransferFailed { reason }) if reason == "account closed"
    );
    assert_eq!(h.vault.state(), before);
    assert!(!h.authority.is_consumed(&auth_id(6)));
    assert!(h.events.is_empty());

    // The untouched authorization still works once the recipient can accept.
    let alice = AccountWallet::new(ALICE);
    h.vault
        .withdraw(&alice, Amount::new(200), auth_id(6), &signed.signature)
        .unwrap();
    assert_eq!(h.vault.balance(), Amount::new(300));
    assert_eq!(
        h.vault.state(),
        VaultState {
            balance: Amount::new(300),
            total_withdrawn: Amount::new(200),
            withdrawn_by_recipient: [(ALICE, Amount::new(200))].into_iter().collect(),
        }
    );
}

#[test]
fn vault_in_other_domain_rejected() {
    let h = Harness::with_store(Arc::new(MemoryStore::new()), DomainId::new(2));
    h.fund(100);
    let signed = h.authorize(ALICE, 10, 7);
    let alice = AccountWallet::new(ALICE);

    assert_matches!(
        h.vault
            .withdraw(&alice, Amount::new(10), auth_id(7), &signed.signature),
        Err(WardenError::DomainMismatch { .. })
    );
    assert_eq!(h.vault.balance(), Amount::new(100));
}

#[test]
fn unbound_or_foreign_vault_cannot_withdraw() {
    init_tracing();
    let issuer = issuer(1);
    let events = Arc::new(RecordingSink::new());
    let authority = Arc::new(AuthorizationAuthority::new(
        AuthoritySettings {
            signer: issuer.identity().unwrap(),
            owner: OWNER,
            domain: DOMAIN,
        },
        events.clone(),
    ));
    let settings = VaultSettings {
        resource_id: VAULT,
        domain: DOMAIN,
    };
    let vault = VaultLedger::new(settings, authority.clone(), events.clone());
    vault.deposit(DEPOSITOR, Amount::new(100)).unwrap();

    let signed = issuer.issue(warden_core::AuthorizationRequest {
        domain: DOMAIN,
        resource: VAULT,
        recipient: ALICE,
        amount: Amount::new(10),
        authorization_id: auth_id(8),
    });
    let alice = AccountWallet::new(ALICE);

    assert_eq!(
        vault
            .withdraw(&alice, Amount::new(10), auth_id(8), &signed.signature)
            .unwrap_err(),
        WardenError::NotInitialized
    );

    // Handed the capability of some other vault: not an accepted caller.
    let other = authority
        .bind(&OWNER, ResourceId::from_bytes([0x77; 32]))
        .unwrap();
    vault.attach(other).unwrap();
    assert_eq!(
        vault
            .withdraw(&alice, Amount::new(10), auth_id(8), &signed.signature)
            .unwrap_err(),
        WardenError::UnauthorizedCaller
    );
    assert_eq!(vault.balance(), Amount::new(100));
}

#[test]
fn authority_handle_alone_cannot_consume() {
    let h = Harness::new();
    h.fund(1_000);
    let signed = h.authorize(ALICE, 100, 9);

    // The authority is reachable from the vault, but consuming needs the
    // vault's own capability.
    assert_eq!(
        h.vault
            .authority()
            .verify_and_consume(&rogue_capability(), &signed.request, &signed.signature)
            .unwrap_err(),
        WardenError::UnauthorizedCaller
    );
    assert!(!h.authority.is_consumed(&auth_id(9)));
    assert!(h.events.is_empty());

    let alice = AccountWallet::new(ALICE);
    h.vault
        .withdraw(&alice, Amount::new(100), auth_id(9), &signed.signature)
        .unwrap();
    assert_eq!(alice.received(), Amount::new(100));
    assert_eq!(h.vault.balance(), Amount::new(900));
}

#[test]
fn capability_attaches_once() {
    let h = Harness::new();
    assert!(h.vault.is_attached());
    assert_eq!(
        h.vault.attach(rogue_capability()),
        Err(WardenError::AlreadyBound)
    );

    // The original capability is still the one in use.
    h.fund(10);
    let signed = h.authorize(ALICE, 10, 10);
    h.vault
        .withdraw(
            &AccountWallet::new(ALICE),
            Amount::new(10),
            auth_id(10),
            &signed.signature,
        )
        .unwrap();
}
