//! Capped issuance policy.
//!
//! The single authoritative clamp between the nominal block reward and the
//! hard supply cap. Pure functions only; the ledger calls into this module
//! while holding its write lock so the clamp and the append cannot interleave
//! with another mint.

use crate::params::MonetaryPolicy;
use issuance_types::Amount;

/// Exact amount mintable given the current supply.
///
/// Returns zero once the cap is reached, the remaining headroom on the block
/// that would cross the cap, and `nominal_reward` otherwise.
pub fn compute_mintable(current_supply: &Amount, max_supply: &Amount, nominal_reward: &Amount) -> Amount {
    if current_supply >= max_supply {
        return Amount::zero();
    }

    let remaining = max_supply - current_supply;
    if nominal_reward < &remaining {
        nominal_reward.clone()
    } else {
        remaining
    }
}

/// Outcome of applying the policy to one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuanceDecision {
    /// The full nominal reward fits under the cap.
    Full(Amount),
    /// Only the remaining headroom is minted.
    Partial { minted: Amount, nominal: Amount },
    /// Supply already sits at the cap; nothing is minted.
    CapReached,
}

impl IssuanceDecision {
    /// Decide the reward for the next block from the canonical supply.
    pub fn for_supply(current_supply: &Amount, policy: &MonetaryPolicy) -> Self {
        let nominal = &policy.nominal_block_reward;
        let mintable = compute_mintable(current_supply, &policy.max_supply, nominal);

        if mintable.is_zero() {
            IssuanceDecision::CapReached
        } else if &mintable < nominal {
            IssuanceDecision::Partial {
                minted: mintable,
                nominal: nominal.clone(),
            }
        } else {
            IssuanceDecision::Full(mintable)
        }
    }

    /// Amount that is (or was) minted under this decision.
    pub fn amount(&self) -> Amount {
        match self {
            IssuanceDecision::Full(amount) => amount.clone(),
            IssuanceDecision::Partial { minted, .. } => minted.clone(),
            IssuanceDecision::CapReached => Amount::zero(),
        }
    }

    pub fn is_cap_reached(&self) -> bool {
        matches!(self, IssuanceDecision::CapReached)
    }
}
