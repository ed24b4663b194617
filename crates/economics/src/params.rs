use crate::errors::PolicyError;
use issuance_types::{tokens, Amount, UNITS_PER_TOKEN};
use serde::{Deserialize, Serialize};

/// Hard supply cap, in smallest units, as it appears in chain configuration.
pub const MAX_SUPPLY_UNITS: &str = "1000000000000000000000000000";

/// Nominal block reward in smallest units (one whole token).
pub const NOMINAL_BLOCK_REWARD_UNITS: u64 = UNITS_PER_TOKEN;

/// Static parameters controlling issuance.
///
/// Not mutated at runtime. Amounts are written as decimal strings in config
/// files (`0x` hex is accepted as well).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonetaryPolicy {
    /// Total circulating supply may never exceed this value.
    pub max_supply: Amount,
    /// Reward intended for every produced block before cap clamping.
    pub nominal_block_reward: Amount,
}

impl Default for MonetaryPolicy {
    fn default() -> Self {
        // 1 billion tokens, 1 token per block
        Self {
            max_supply: tokens(1_000_000_000),
            nominal_block_reward: Amount::from(NOMINAL_BLOCK_REWARD_UNITS),
        }
    }
}

impl MonetaryPolicy {
    pub fn new(max_supply: Amount, nominal_block_reward: Amount) -> Result<Self, PolicyError> {
        let policy = Self {
            max_supply,
            nominal_block_reward,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_supply.is_zero() {
            return Err(PolicyError::InvalidParameter("max_supply must be positive"));
        }
        if self.nominal_block_reward.is_zero() {
            return Err(PolicyError::InvalidParameter(
                "nominal_block_reward must be positive",
            ));
        }
        if self.nominal_block_reward > self.max_supply {
            return Err(PolicyError::InvalidParameter(
                "nominal_block_reward must not exceed max_supply",
            ));
        }
        Ok(())
    }
}
