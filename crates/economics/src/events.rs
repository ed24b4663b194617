//! Structured monetary events and the observability sink they are sent to.
//!
//! The ledger and the block issuer never format log lines themselves; they
//! hand a [`SupplyEvent`] to the injected [`SupplyObserver`].

use issuance_types::{Address, Amount};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Kind of supply mutation an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyAction {
    Mint,
    Burn,
    Reset,
}

impl fmt::Display for SupplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupplyAction::Mint => "mint",
            SupplyAction::Burn => "burn",
            SupplyAction::Reset => "reset",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupplyEvent {
    Minted {
        block: u64,
        amount: Amount,
        total_supply: Amount,
        caller: String,
    },
    Burned {
        block: u64,
        amount: Amount,
        total_supply: Amount,
        caller: String,
    },
    /// The block crossed the cap and received less than the nominal reward.
    PartialReward {
        block: u64,
        nominal: Amount,
        minted: Amount,
    },
    /// No reward was minted because supply is at the cap.
    CapReached { block: u64, total_supply: Amount },
    /// A reward or fee credit opened a previously unknown account.
    AccountCreated { block: u64, address: Address },
    FeesDistributed {
        block: u64,
        owner: Address,
        producer: Address,
        owner_share: Amount,
        producer_share: Amount,
    },
    Rejected {
        block: u64,
        action: SupplyAction,
        reason: String,
    },
    InitialSupplyReset { previous: Amount, current: Amount },
}

/// Sink for monetary events.
pub trait SupplyObserver: Send + Sync {
    fn observe(&self, event: &SupplyEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SupplyObserver for NoopObserver {
    fn observe(&self, _event: &SupplyEvent) {}
}

/// Renders events through `tracing` under the `issuance` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SupplyObserver for TracingObserver {
    fn observe(&self, event: &SupplyEvent) {
        match event {
            SupplyEvent::Minted {
                block,
                amount,
                total_supply,
                caller,
            } => info!(
                target: "issuance",
                block,
                caller = %caller,
                "Minted {} tokens, supply now {} tokens",
                amount.to_token_string(),
                total_supply.to_token_string()
            ),
            SupplyEvent::Burned {
                block,
                amount,
                total_supply,
                caller,
            } => info!(
                target: "issuance",
                block,
                caller = %caller,
                "Burned {} tokens, supply now {} tokens",
                amount.to_token_string(),
                total_supply.to_token_string()
            ),
            SupplyEvent::PartialReward {
                block,
                nominal,
                minted,
            } => info!(
                target: "issuance",
                block,
                "Partial reward at supply cap: {} of {} tokens",
                minted.to_token_string(),
                nominal.to_token_string()
            ),
            SupplyEvent::CapReached {
                block,
                total_supply,
            } => info!(
                target: "issuance",
                block,
                "Supply cap reached at {} tokens, no reward minted",
                total_supply.to_token_string()
            ),
            SupplyEvent::AccountCreated { block, address } => debug!(
                target: "issuance",
                block,
                "Credit opened account {}",
                address
            ),
            SupplyEvent::FeesDistributed {
                block,
                owner,
                producer,
                owner_share,
                producer_share,
            } => debug!(
                target: "issuance",
                block,
                "Fees split: {} to owner {}, {} to producer {}",
                owner_share,
                owner,
                producer_share,
                producer
            ),
            SupplyEvent::Rejected {
                block,
                action,
                reason,
            } => warn!(
                target: "issuance",
                block,
                action = %action,
                "Supply mutation rejected: {}",
                reason
            ),
            SupplyEvent::InitialSupplyReset { previous, current } => warn!(
                target: "issuance",
                "Initial supply reset from {} to {}",
                previous,
                current
            ),
        }
    }
}

/// Keeps every observed event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SupplyEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events observed so far.
    pub fn events(&self) -> Vec<SupplyEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl SupplyObserver for RecordingObserver {
    fn observe(&self, event: &SupplyEvent) {
        self.events.lock().push(event.clone());
    }
}
