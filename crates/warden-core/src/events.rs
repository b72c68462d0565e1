//! Ledger notifications
//!
//! These are the only externally observable audit trail. Each is emitted once
//! per successful operation and never on failure.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::identifiers::{AccountId, Amount, AuthorizationId, ResourceId};

/// Notification emitted by the authority or the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Value deposited into a vault
    Deposited {
        /// Depositing account
        source: AccountId,
        /// Amount deposited
        amount: Amount,
    },

    /// Value released from a vault
    Withdrawal {
        /// Receiving account
        recipient: AccountId,
        /// Amount released
        amount: Amount,
        /// Authorization that permitted the release
        authorization_id: AuthorizationId,
    },

    /// Authorization verified and permanently consumed
    AuthorizationConsumed {
        /// Consumed identifier
        authorization_id: AuthorizationId,
        /// Vault the authorization was consumed for
        resource: ResourceId,
        /// Authorized recipient
        recipient: AccountId,
        /// Authorized amount
        amount: Amount,
    },

    /// Authority bound to its vault
    ResourceBound {
        /// The bound vault
        resource_id: ResourceId,
    },
}

/// Receiver of ledger notifications
pub trait EventSink: Send + Sync {
    /// Deliver one notification
    fn emit(&self, event: LedgerEvent);
}

/// Writes every notification to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LedgerEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "warden::audit", event = %json, "ledger event"),
            Err(_) => info!(target: "warden::audit", ?event, "ledger event"),
        }
    }
}

/// Keeps an ordered in-memory copy of every notification
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded notifications
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Discard recorded notifications
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LedgerEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards each notification to several sinks, in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Create an empty fanout
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream sink
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: LedgerEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fanout_delivers_to_all() {
        let a = Arc::new(RecordingSink::new());
        let b = Arc::new(RecordingSink::new());
        let fanout = FanoutSink::new().with(a.clone()).with(b.clone());

        fanout.emit(LedgerEvent::ResourceBound {
            resource_id: ResourceId::from_bytes([1u8; 32]),
        });

        assert_eq!(a.len(), 1);
        assert_eq!(a.events(), b.events());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = LedgerEvent::Deposited {
            source: AccountId::from_bytes([2u8; 32]),
            amount: Amount::new(10),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deposited");
        assert_eq!(json["amount"], 10);
    }
}
