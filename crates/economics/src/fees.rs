//! Transaction fee splitting between the network owner and the block producer.
//!
//! Fees are not newly issued currency: they move value that already exists,
//! so the supply ledger is never touched here.

use crate::errors::StateError;
use crate::state::BalanceState;
use issuance_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of splitting one block's fees.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistribution {
    pub owner_share: Amount,
    pub producer_share: Amount,
}

impl FeeDistribution {
    pub fn total(&self) -> Amount {
        &self.owner_share + &self.producer_share
    }

    pub fn is_empty(&self) -> bool {
        self.owner_share.is_zero() && self.producer_share.is_zero()
    }
}

/// Owner gets `floor(fees / 2)`, the producer gets the remainder, so odd
/// totals favour the producer by one unit.
pub fn split_fees(total_fees: &Amount) -> FeeDistribution {
    let owner_share = total_fees.half();
    let producer_share = total_fees - &owner_share;
    FeeDistribution {
        owner_share,
        producer_share,
    }
}

/// Credit both shares of `total_fees`. Absent or zero fees are a no-op.
///
/// Credits are applied owner first. If the producer credit fails the owner
/// credit has already been applied; rolling it back is the state engine's
/// transactional responsibility.
pub fn distribute_fees<S>(
    state: &mut S,
    total_fees: Option<&Amount>,
    owner: &Address,
    producer: &Address,
) -> Result<FeeDistribution, StateError>
where
    S: BalanceState + ?Sized,
{
    let total_fees = match total_fees {
        Some(fees) if !fees.is_zero() => fees,
        _ => {
            debug!(target: "issuance", "No fees to distribute");
            return Ok(FeeDistribution::default());
        }
    };

    let distribution = split_fees(total_fees);
    state.add_balance(owner, &distribution.owner_share)?;
    state.add_balance(producer, &distribution.producer_share)?;

    Ok(distribution)
}
