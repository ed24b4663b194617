//! Block-production adapter.
//!
//! Ties the supply ledger, the capped issuance policy and the fee splitter to
//! the balance capability of the state-transition engine. The issuer holds the
//! consensus-engine authority; nothing outside it can mint.

use crate::auth::{AuthorizationGuard, MintAuthority, SanctionedRole};
use crate::errors::SupplyError;
use crate::events::{SupplyEvent, SupplyObserver};
use crate::fees::{self, FeeDistribution};
use crate::genesis::{GenesisAccumulator, GenesisAlloc};
use crate::ledger::SupplyLedger;
use crate::params::MonetaryPolicy;
use crate::policy::IssuanceDecision;
use crate::state::BalanceState;
use issuance_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-block inputs from the block producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Protocol owner; receives the block reward and half the fees.
    pub owner: Address,
    pub producer: Address,
    pub total_fees: Option<Amount>,
}

/// What one block settled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSettlement {
    pub block: u64,
    pub reward: Amount,
    pub cap_reached: bool,
    pub fees: FeeDistribution,
}

pub struct BlockIssuer {
    ledger: Arc<SupplyLedger>,
    authority: MintAuthority,
    observer: Arc<dyn SupplyObserver>,
}

impl BlockIssuer {
    /// Fails with [`SupplyError::SupplyCapExceeded`] when `initial_supply`
    /// is above the policy cap.
    pub fn new(
        initial_supply: Amount,
        policy: MonetaryPolicy,
        observer: Arc<dyn SupplyObserver>,
    ) -> Result<Self, SupplyError> {
        let guard = AuthorizationGuard::new();
        let authority = guard.issue(SanctionedRole::ConsensusEngine);
        let ledger =
            SupplyLedger::new(initial_supply, policy, guard)?.with_observer(observer.clone());

        Ok(Self {
            ledger: Arc::new(ledger),
            authority,
            observer,
        })
    }

    /// Seed the ledger with the premine of `alloc`.
    pub fn from_genesis(
        alloc: &GenesisAlloc,
        accumulator: &GenesisAccumulator,
        policy: MonetaryPolicy,
        observer: Arc<dyn SupplyObserver>,
    ) -> Result<Self, SupplyError> {
        Self::new(accumulator.compute_total(alloc), policy, observer)
    }

    /// Shared read access for observers and RPC-style queries.
    pub fn ledger(&self) -> Arc<SupplyLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn current_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    /// Mint the clamped block reward to `beneficiary`.
    ///
    /// The clamp, the balance credit and the audit append happen under one
    /// ledger lock. At the cap this is a successful no-op.
    pub fn mint_block_reward<S>(
        &self,
        state: &mut S,
        block: u64,
        beneficiary: &Address,
    ) -> Result<IssuanceDecision, SupplyError>
    where
        S: BalanceState + ?Sized,
    {
        let existed = state.account_exists(beneficiary);

        let decision = self.ledger.mint_capped(block, &self.authority, |amount| {
            state.add_balance(beneficiary, amount)
        })?;

        if !existed && !decision.is_cap_reached() {
            self.observer.observe(&SupplyEvent::AccountCreated {
                block,
                address: *beneficiary,
            });
        }

        Ok(decision)
    }

    /// Split `total_fees` between owner and producer. Supply is unchanged.
    pub fn distribute_fees<S>(
        &self,
        state: &mut S,
        block: u64,
        total_fees: Option<&Amount>,
        owner: &Address,
        producer: &Address,
    ) -> Result<FeeDistribution, SupplyError>
    where
        S: BalanceState + ?Sized,
    {
        let distribution = fees::distribute_fees(state, total_fees, owner, producer)?;

        if !distribution.is_empty() {
            self.observer.observe(&SupplyEvent::FeesDistributed {
                block,
                owner: *owner,
                producer: *producer,
                owner_share: distribution.owner_share.clone(),
                producer_share: distribution.producer_share.clone(),
            });
        }

        Ok(distribution)
    }

    /// Record a burn of value the state engine has already removed.
    pub fn burn(&self, amount: &Amount, block: u64) -> Result<(), SupplyError> {
        self.ledger.burn(amount, block, &self.authority)
    }

    /// Replace the ledger's initial supply with the premine of `alloc`,
    /// recomputed after invalidating the accumulator cache.
    pub fn resync_genesis(
        &self,
        alloc: &GenesisAlloc,
        accumulator: &GenesisAccumulator,
    ) -> Result<(), SupplyError> {
        accumulator.invalidate();
        self.reset_initial_supply(accumulator.compute_total(alloc))
    }

    /// Administrative reset of the initial supply under the issuer's
    /// authority. Rejected if the resulting total would leave `0..=cap`.
    pub fn reset_initial_supply(&self, initial_supply: Amount) -> Result<(), SupplyError> {
        self.ledger.reset_initial_supply(initial_supply, &self.authority)
    }

    /// Reward the owner, then split the block's fees.
    pub fn process_block<S>(
        &self,
        state: &mut S,
        block: u64,
        context: &BlockContext,
    ) -> Result<BlockSettlement, SupplyError>
    where
        S: BalanceState + ?Sized,
    {
        let decision = self.mint_block_reward(state, block, &context.owner)?;
        let fees = self.distribute_fees(
            state,
            block,
            context.total_fees.as_ref(),
            &context.owner,
            &context.producer,
        )?;

        Ok(BlockSettlement {
            block,
            reward: decision.amount(),
            cap_reached: decision.is_cap_reached(),
            fees,
        })
    }
}

impl std::fmt::Debug for BlockIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockIssuer")
            .field("ledger", &self.ledger)
            .field("role", &self.authority.role())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NoopObserver, RecordingObserver};
    use crate::genesis::GenesisAccount;
    use crate::state::InMemoryState;
    use issuance_types::tokens;

    fn owner() -> Address {
        Address::new([0x11; 20])
    }

    fn producer() -> Address {
        Address::new([0x22; 20])
    }

    #[test]
    fn test_block_reward_credits_beneficiary() {
        let issuer = BlockIssuer::new(Amount::zero(), MonetaryPolicy::default(), Arc::new(NoopObserver)).unwrap();
        let mut state = InMemoryState::new();

        let decision = issuer.mint_block_reward(&mut state, 1, &owner()).unwrap();
        assert_eq!(decision, IssuanceDecision::Full(tokens(1)));
        assert_eq!(state.balance(&owner()), tokens(1));
        assert_eq!(issuer.current_supply(), tokens(1));
        assert_eq!(issuer.ledger().audit_log()[0].caller, "consensus_engine");
    }

    #[test]
    fn test_from_genesis_seeds_premine() {
        let mut alloc = GenesisAlloc::new();
        alloc.insert(Address::ZERO, GenesisAccount::with_balance(tokens(5)));
        alloc.insert(owner(), GenesisAccount::with_balance(tokens(100)));

        let accumulator = GenesisAccumulator::new();
        let issuer = BlockIssuer::from_genesis(
            &alloc,
            &accumulator,
            MonetaryPolicy::default(),
            Arc::new(NoopObserver),
        )
        .unwrap();

        assert_eq!(issuer.current_supply(), tokens(100));
        assert_eq!(accumulator.cached(), Some(tokens(100)));
    }

    #[test]
    fn test_process_block_settles_reward_and_fees() {
        let observer = Arc::new(RecordingObserver::new());
        let issuer = BlockIssuer::new(Amount::zero(), MonetaryPolicy::default(), observer.clone()).unwrap();
        let mut state = InMemoryState::new();

        let context = BlockContext {
            owner: owner(),
            producer: producer(),
            total_fees: Some(Amount::from(101)),
        };
        let settlement = issuer.process_block(&mut state, 1, &context).unwrap();

        assert_eq!(settlement.reward, tokens(1));
        assert!(!settlement.cap_reached);
        assert_eq!(settlement.fees.owner_share, Amount::from(50));
        assert_eq!(settlement.fees.producer_share, Amount::from(51));

        assert_eq!(state.balance(&owner()), &tokens(1) + &Amount::from(50));
        assert_eq!(state.balance(&producer()), Amount::from(51));
        // fees never touch supply
        assert_eq!(issuer.current_supply(), tokens(1));

        let events = observer.events();
        assert!(matches!(events[0], SupplyEvent::Minted { block: 1, .. }));
        assert_eq!(
            events[1],
            SupplyEvent::AccountCreated {
                block: 1,
                address: owner()
            }
        );
        assert!(matches!(events[2], SupplyEvent::FeesDistributed { .. }));
    }

    #[test]
    fn test_cap_reached_is_not_an_error() {
        let policy = MonetaryPolicy::default();
        let issuer = BlockIssuer::new(policy.max_supply.clone(), policy, Arc::new(NoopObserver)).unwrap();
        let mut state = InMemoryState::new();

        let decision = issuer.mint_block_reward(&mut state, 9, &owner()).unwrap();
        assert!(decision.is_cap_reached());
        assert!(!state.account_exists(&owner()));
        assert_eq!(issuer.ledger().audit_len(), 0);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let issuer = BlockIssuer::new(tokens(10), MonetaryPolicy::default(), Arc::new(NoopObserver)).unwrap();

        issuer.burn(&tokens(4), 3).unwrap();
        assert_eq!(issuer.current_supply(), tokens(6));

        assert_eq!(
            issuer.burn(&tokens(7), 4),
            Err(SupplyError::InsufficientSupply {
                requested: tokens(7),
                available: tokens(6),
            })
        );
    }

    #[test]
    fn test_initial_supply_over_cap_rejected() {
        let policy = MonetaryPolicy::new(tokens(10), tokens(1)).unwrap();
        let err = BlockIssuer::new(tokens(15), policy, Arc::new(NoopObserver)).unwrap_err();
        assert_eq!(
            err,
            SupplyError::SupplyCapExceeded {
                resulting: tokens(15),
                cap: tokens(10),
            }
        );
    }

    #[test]
    fn test_genesis_premine_over_cap_rejected() {
        let policy = MonetaryPolicy::default();
        let mut alloc = GenesisAlloc::new();
        alloc.insert(
            owner(),
            GenesisAccount::with_balance(&policy.max_supply + &Amount::from(1)),
        );

        let result = BlockIssuer::from_genesis(
            &alloc,
            &GenesisAccumulator::new(),
            policy.clone(),
            Arc::new(NoopObserver),
        );
        assert!(matches!(
            result,
            Err(SupplyError::SupplyCapExceeded { ref cap, .. }) if *cap == policy.max_supply
        ));
    }

    #[test]
    fn test_reset_and_resync_genesis() {
        let observer = Arc::new(RecordingObserver::new());
        let issuer = BlockIssuer::new(Amount::zero(), MonetaryPolicy::default(), observer.clone()).unwrap();
        let mut state = InMemoryState::new();
        issuer.mint_block_reward(&mut state, 1, &owner()).unwrap();

        issuer.reset_initial_supply(tokens(50)).unwrap();
        assert_eq!(issuer.current_supply(), tokens(51));
        assert!(observer.events().contains(&SupplyEvent::InitialSupplyReset {
            previous: Amount::zero(),
            current: tokens(50),
        }));

        let accumulator = GenesisAccumulator::new();
        let mut alloc = GenesisAlloc::new();
        alloc.insert(producer(), GenesisAccount::with_balance(tokens(7)));
        // a stale cached value is discarded
        accumulator.compute_total(&GenesisAlloc::new());

        issuer.resync_genesis(&alloc, &accumulator).unwrap();
        assert_eq!(issuer.ledger().initial_supply(), tokens(7));
        assert_eq!(issuer.current_supply(), tokens(8));
        assert_eq!(issuer.ledger().audit_len(), 1);

        let cap = issuer.ledger().policy().max_supply.clone();
        assert!(matches!(
            issuer.reset_initial_supply(cap),
            Err(SupplyError::SupplyCapExceeded { .. })
        ));
    }
}
