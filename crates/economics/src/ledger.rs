//! Supply ledger and audit trail.
//!
//! The ledger is the canonical source of current supply:
//! `initial_supply + Σ mints − Σ burns`, recomputed from the audit log on
//! every read. All mutations run their checks and the append inside one
//! exclusive critical section, so two mints can never both pass the cap check
//! against the same supply.
//!
//! Each audit entry is chained to its predecessor with a BLAKE3 digest, which
//! makes any later edit of an exported copy detectable with
//! [`verify_audit_entries`].

use crate::auth::{AuthorizationGuard, Caller};
use crate::errors::{AuditChainError, StateError, SupplyError};
use crate::events::{NoopObserver, SupplyAction, SupplyEvent, SupplyObserver};
use crate::params::MonetaryPolicy;
use crate::policy::IssuanceDecision;
use issuance_types::Amount;
use num_bigint::BigInt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;

pub type Digest = [u8; 32];

/// Digest the first audit entry links to.
pub const GENESIS_DIGEST: Digest = [0u8; 32];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Mint,
    Burn,
}

impl AuditKind {
    fn tag(&self) -> u8 {
        match self {
            AuditKind::Mint => 0x01,
            AuditKind::Burn => 0x02,
        }
    }
}

/// Immutable record of one supply change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub block_number: u64,
    pub amount: Amount,
    pub kind: AuditKind,
    /// Seconds since the Unix epoch. Informational only.
    pub timestamp: u64,
    pub caller: String,
    #[serde(with = "hex::serde")]
    pub prev_digest: Digest,
    #[serde(with = "hex::serde")]
    pub digest: Digest,
}

impl AuditEntry {
    fn new(
        prev_digest: Digest,
        block_number: u64,
        amount: Amount,
        kind: AuditKind,
        timestamp: u64,
        caller: String,
    ) -> Self {
        let digest = entry_digest(&prev_digest, block_number, &amount, kind, timestamp, &caller);
        Self {
            block_number,
            amount,
            kind,
            timestamp,
            caller,
            prev_digest,
            digest,
        }
    }

    /// Recompute this entry's digest from its contents.
    pub fn expected_digest(&self) -> Digest {
        entry_digest(
            &self.prev_digest,
            self.block_number,
            &self.amount,
            self.kind,
            self.timestamp,
            &self.caller,
        )
    }
}

fn entry_digest(
    prev: &Digest,
    block_number: u64,
    amount: &Amount,
    kind: AuditKind,
    timestamp: u64,
    caller: &str,
) -> Digest {
    let amount_bytes = amount.to_bytes_be();

    let mut hasher = blake3::Hasher::new();
    hasher.update(prev);
    hasher.update(&block_number.to_le_bytes());
    hasher.update(&(amount_bytes.len() as u64).to_le_bytes());
    hasher.update(&amount_bytes);
    hasher.update(&[kind.tag()]);
    hasher.update(&timestamp.to_le_bytes());
    hasher.update(&(caller.len() as u64).to_le_bytes());
    hasher.update(caller.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Check that `entries` form an unbroken chain starting at [`GENESIS_DIGEST`].
pub fn verify_audit_entries(entries: &[AuditEntry]) -> Result<(), AuditChainError> {
    let mut expected_prev = GENESIS_DIGEST;
    for (index, entry) in entries.iter().enumerate() {
        if entry.prev_digest != expected_prev {
            return Err(AuditChainError::BrokenLink { index });
        }
        if entry.expected_digest() != entry.digest {
            return Err(AuditChainError::DigestMismatch { index });
        }
        expected_prev = entry.digest;
    }
    Ok(())
}

/// Point-in-time view of the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyInfo {
    pub initial_supply: Amount,
    pub total_supply: Amount,
    pub max_supply: Amount,
    pub remaining_supply: Amount,
    pub total_minted: Amount,
    pub total_burned: Amount,
    pub audit_entries: usize,
}

#[derive(Debug)]
struct LedgerState {
    initial_supply: Amount,
    entries: Vec<AuditEntry>,
}

impl LedgerState {
    fn totals(&self) -> (Amount, Amount) {
        let mut minted = Amount::zero();
        let mut burned = Amount::zero();
        for entry in &self.entries {
            match entry.kind {
                AuditKind::Mint => minted += &entry.amount,
                AuditKind::Burn => burned += &entry.amount,
            }
        }
        (minted, burned)
    }

    fn total_supply(&self) -> Amount {
        let (minted, burned) = self.totals();
        // burns and resets are validated against the running total, so this
        // never saturates
        (&self.initial_supply + &minted).saturating_sub(&burned)
    }

    fn last_digest(&self) -> Digest {
        self.entries
            .last()
            .map(|entry| entry.digest)
            .unwrap_or(GENESIS_DIGEST)
    }

    fn append(&mut self, block_number: u64, amount: Amount, kind: AuditKind, caller: String) {
        let entry = AuditEntry::new(
            self.last_digest(),
            block_number,
            amount,
            kind,
            unix_timestamp(),
            caller,
        );
        self.entries.push(entry);
    }
}

fn unix_timestamp() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or(0)
}

/// Reject zero and negative requests.
fn positive_amount(amount: &BigInt) -> Result<Amount, SupplyError> {
    Amount::from_signed(amount)
        .filter(|amount| !amount.is_zero())
        .ok_or(SupplyError::InvalidAmount)
}

/// Authoritative supply tracker.
pub struct SupplyLedger {
    policy: MonetaryPolicy,
    guard: AuthorizationGuard,
    observer: Arc<dyn SupplyObserver>,
    state: RwLock<LedgerState>,
}

impl SupplyLedger {
    /// Create a ledger seeded with `initial_supply` (normally the genesis
    /// premine). The guard is moved in; authorities must be issued from it
    /// beforehand.
    ///
    /// Fails with [`SupplyError::SupplyCapExceeded`] when the seed already
    /// exceeds `policy.max_supply`.
    pub fn new(
        initial_supply: Amount,
        policy: MonetaryPolicy,
        guard: AuthorizationGuard,
    ) -> Result<Self, SupplyError> {
        if initial_supply > policy.max_supply {
            return Err(SupplyError::SupplyCapExceeded {
                resulting: initial_supply,
                cap: policy.max_supply,
            });
        }

        Ok(Self {
            policy,
            guard,
            observer: Arc::new(NoopObserver),
            state: RwLock::new(LedgerState {
                initial_supply,
                entries: Vec::new(),
            }),
        })
    }

    /// Attach the event sink.
    ///
    /// Success events are delivered while the write lock is held, so they
    /// arrive in audit-log order. The observer must not call back into this
    /// ledger.
    pub fn with_observer(mut self, observer: Arc<dyn SupplyObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &MonetaryPolicy {
        &self.policy
    }

    pub fn initial_supply(&self) -> Amount {
        self.state.read().initial_supply.clone()
    }

    /// Current supply, recomputed from the initial value and the full log.
    pub fn total_supply(&self) -> Amount {
        self.state.read().total_supply()
    }

    /// Independent copy of the audit log in chronological order.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.read().entries.clone()
    }

    pub fn audit_len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn supply_info(&self) -> SupplyInfo {
        let state = self.state.read();
        let (total_minted, total_burned) = state.totals();
        let total_supply = state.total_supply();

        SupplyInfo {
            initial_supply: state.initial_supply.clone(),
            remaining_supply: self.policy.max_supply.saturating_sub(&total_supply),
            total_supply,
            max_supply: self.policy.max_supply.clone(),
            total_minted,
            total_burned,
            audit_entries: state.entries.len(),
        }
    }

    /// Verify the digest chain of the live log.
    pub fn verify_audit_chain(&self) -> Result<(), AuditChainError> {
        verify_audit_entries(&self.state.read().entries)
    }

    /// Mint exactly `amount`. Does not clamp: fails with
    /// [`SupplyError::SupplyCapExceeded`] when the cap would be crossed.
    pub fn mint(
        &self,
        amount: impl Into<BigInt>,
        block_number: u64,
        caller: impl Into<Caller>,
    ) -> Result<(), SupplyError> {
        self.mint_with(amount, block_number, caller, |_| Ok(()))
    }

    /// Mint exactly `amount`, running `apply` (the balance credit) inside the
    /// same critical section as the audit append. If `apply` fails nothing is
    /// recorded.
    pub fn mint_with<F>(
        &self,
        amount: impl Into<BigInt>,
        block_number: u64,
        caller: impl Into<Caller>,
        apply: F,
    ) -> Result<(), SupplyError>
    where
        F: FnOnce(&Amount) -> Result<(), StateError>,
    {
        self.try_mint(&amount.into(), block_number, &caller.into(), apply)
            .map_err(|err| self.reject(block_number, SupplyAction::Mint, err))
    }

    /// Mint the policy-clamped block reward: full nominal reward, the
    /// remaining headroom, or nothing at the cap. The clamp is evaluated
    /// against the supply seen under the write lock.
    pub fn mint_capped<F>(
        &self,
        block_number: u64,
        caller: impl Into<Caller>,
        apply: F,
    ) -> Result<IssuanceDecision, SupplyError>
    where
        F: FnOnce(&Amount) -> Result<(), StateError>,
    {
        self.try_mint_capped(block_number, &caller.into(), apply)
            .map_err(|err| self.reject(block_number, SupplyAction::Mint, err))
    }

    /// Burn exactly `amount` from circulating supply.
    pub fn burn(
        &self,
        amount: impl Into<BigInt>,
        block_number: u64,
        caller: impl Into<Caller>,
    ) -> Result<(), SupplyError> {
        self.try_burn(&amount.into(), block_number, &caller.into())
            .map_err(|err| self.reject(block_number, SupplyAction::Burn, err))
    }

    /// Administrative replacement of the initial supply (e.g. after the
    /// genesis premine is recomputed). The resulting total must stay within
    /// `0..=max_supply` given the existing log.
    pub fn reset_initial_supply(
        &self,
        initial_supply: Amount,
        caller: impl Into<Caller>,
    ) -> Result<(), SupplyError> {
        self.try_reset(initial_supply, &caller.into())
            .map_err(|err| self.reject(0, SupplyAction::Reset, err))
    }

    fn authorize(&self, caller: &Caller) -> Result<String, SupplyError> {
        if self.guard.is_authorized(caller) {
            Ok(caller.label())
        } else {
            Err(SupplyError::Unauthorized {
                caller: caller.label(),
            })
        }
    }

    fn reject(&self, block_number: u64, action: SupplyAction, err: SupplyError) -> SupplyError {
        self.observer.observe(&SupplyEvent::Rejected {
            block: block_number,
            action,
            reason: err.to_string(),
        });
        err
    }

    fn try_mint<F>(
        &self,
        amount: &BigInt,
        block_number: u64,
        caller: &Caller,
        apply: F,
    ) -> Result<(), SupplyError>
    where
        F: FnOnce(&Amount) -> Result<(), StateError>,
    {
        let amount = positive_amount(amount)?;

        let mut state = self.state.write();
        let label = self.authorize(caller)?;

        let resulting = &state.total_supply() + &amount;
        if resulting > self.policy.max_supply {
            return Err(SupplyError::SupplyCapExceeded {
                resulting,
                cap: self.policy.max_supply.clone(),
            });
        }

        apply(&amount)?;
        state.append(block_number, amount.clone(), AuditKind::Mint, label.clone());
        self.observer.observe(&SupplyEvent::Minted {
            block: block_number,
            amount,
            total_supply: resulting,
            caller: label,
        });
        Ok(())
    }

    fn try_mint_capped<F>(
        &self,
        block_number: u64,
        caller: &Caller,
        apply: F,
    ) -> Result<IssuanceDecision, SupplyError>
    where
        F: FnOnce(&Amount) -> Result<(), StateError>,
    {
        let mut state = self.state.write();
        let label = self.authorize(caller)?;

        let current = state.total_supply();
        let decision = IssuanceDecision::for_supply(&current, &self.policy);
        let amount = decision.amount();
        if amount.is_zero() {
            self.observer.observe(&SupplyEvent::CapReached {
                block: block_number,
                total_supply: current,
            });
            return Ok(decision);
        }

        let resulting = &current + &amount;
        if resulting > self.policy.max_supply {
            return Err(SupplyError::SupplyCapExceeded {
                resulting,
                cap: self.policy.max_supply.clone(),
            });
        }

        apply(&amount)?;
        state.append(block_number, amount.clone(), AuditKind::Mint, label.clone());

        if let IssuanceDecision::Partial { minted, nominal } = &decision {
            self.observer.observe(&SupplyEvent::PartialReward {
                block: block_number,
                nominal: nominal.clone(),
                minted: minted.clone(),
            });
        }
        self.observer.observe(&SupplyEvent::Minted {
            block: block_number,
            amount,
            total_supply: resulting,
            caller: label,
        });
        Ok(decision)
    }

    fn try_burn(&self, amount: &BigInt, block_number: u64, caller: &Caller) -> Result<(), SupplyError> {
        let amount = positive_amount(amount)?;

        let mut state = self.state.write();
        let label = self.authorize(caller)?;

        let current = state.total_supply();
        let resulting = current
            .checked_sub(&amount)
            .ok_or_else(|| SupplyError::InsufficientSupply {
                requested: amount.clone(),
                available: current.clone(),
            })?;

        state.append(block_number, amount.clone(), AuditKind::Burn, label.clone());
        self.observer.observe(&SupplyEvent::Burned {
            block: block_number,
            amount,
            total_supply: resulting,
            caller: label,
        });
        Ok(())
    }

    fn try_reset(&self, initial_supply: Amount, caller: &Caller) -> Result<(), SupplyError> {
        let mut state = self.state.write();
        self.authorize(caller)?;

        let (minted, burned) = state.totals();
        let available = &initial_supply + &minted;
        let resulting = available
            .checked_sub(&burned)
            .ok_or_else(|| SupplyError::InsufficientSupply {
                requested: burned.clone(),
                available: available.clone(),
            })?;

        if resulting > self.policy.max_supply {
            return Err(SupplyError::SupplyCapExceeded {
                resulting,
                cap: self.policy.max_supply.clone(),
            });
        }

        let previous = std::mem::replace(&mut state.initial_supply, initial_supply.clone());
        self.observer.observe(&SupplyEvent::InitialSupplyReset {
            previous,
            current: initial_supply,
        });
        Ok(())
    }
}

impl std::fmt::Debug for SupplyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("SupplyLedger")
            .field("policy", &self.policy)
            .field("initial_supply", &state.initial_supply)
            .field("audit_entries", &state.entries.len())
            .finish()
    }
}
