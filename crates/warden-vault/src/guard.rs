//! Call-depth guard for withdrawals

use std::sync::atomic::{AtomicBool, Ordering};
use warden_core::{Result, WardenError};

/// Rejects any withdrawal that starts while another is in progress
#[derive(Debug, Default)]
pub(crate) struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    /// Mark the ledger as inside a withdrawal until the returned token drops
    pub(crate) fn enter(&self) -> Result<Entered<'_>> {
        if self.entered.swap(true, Ordering::AcqRel) {
            return Err(WardenError::ReentrantCall);
        }
        Ok(Entered {
            flag: &self.entered,
        })
    }

    pub(crate) fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Proof of entry; leaving clears the flag
#[derive(Debug)]
pub(crate) struct Entered<'a> {
    flag: &'a AtomicBool,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
