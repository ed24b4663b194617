//! Genesis premine accumulation.
//!
//! The premine seeds the supply ledger's initial value. It is the sum of all
//! allocated balances except the system/burn address.

use crate::errors::GenesisError;
use issuance_types::{Address, Amount};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Account record in the genesis allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Amount>,
}

impl GenesisAccount {
    pub fn with_balance(balance: Amount) -> Self {
        Self {
            balance: Some(balance),
        }
    }
}

/// Identity → initial account record.
pub type GenesisAlloc = BTreeMap<Address, GenesisAccount>;

/// Parse the `{"0x…": {"balance": "0x…"}}` allocation shape.
pub fn parse_genesis_alloc(json: &str) -> Result<GenesisAlloc, GenesisError> {
    Ok(serde_json::from_str(json)?)
}

/// Sum of all non-zero-address balances; absent balances count as zero.
pub fn sum_premine(alloc: &GenesisAlloc) -> Amount {
    alloc
        .iter()
        .filter(|(address, _)| !address.is_zero())
        .filter_map(|(_, account)| account.balance.as_ref())
        .sum()
}

/// Computes the premine once and caches it until invalidated.
///
/// The cache is not keyed on the allocation: a later call with a different
/// map returns the cached total until [`GenesisAccumulator::invalidate`].
#[derive(Debug, Default)]
pub struct GenesisAccumulator {
    cached: RwLock<Option<Amount>>,
}

impl GenesisAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_total(&self, alloc: &GenesisAlloc) -> Amount {
        if let Some(total) = self.cached.read().as_ref() {
            return total.clone();
        }

        let mut cached = self.cached.write();
        // another thread may have filled the cache between the two locks
        if let Some(total) = cached.as_ref() {
            return total.clone();
        }

        let total = sum_premine(alloc);
        debug!(
            target: "issuance",
            accounts = alloc.len(),
            "Computed genesis premine: {} tokens",
            total.to_token_string()
        );
        *cached = Some(total.clone());
        total
    }

    /// Cached premine, if computed.
    pub fn cached(&self) -> Option<Amount> {
        self.cached.read().clone()
    }

    /// Drop the cached value; the next `compute_total` recomputes.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }
}
