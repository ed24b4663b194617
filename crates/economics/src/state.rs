//! Balance capability consumed from the state-transition engine.

use crate::errors::StateError;
use crate::genesis::GenesisAlloc;
use issuance_types::{Address, Amount};
use std::collections::BTreeMap;

/// Interface the execution engine exposes for balance reads and credits.
///
/// `add_balance` must either apply the full credit or fail; it never wraps
/// or truncates silently.
pub trait BalanceState {
    fn balance(&self, address: &Address) -> Amount;

    fn add_balance(&mut self, address: &Address, amount: &Amount) -> Result<(), StateError>;

    fn account_exists(&self, address: &Address) -> bool;
}

// -----------------------------------------------------------------------------
// In-memory implementation (for the node simulator and testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryState {
    balances: BTreeMap<Address, Amount>,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed balances from a genesis allocation. Accounts without a balance
    /// are created with zero.
    pub fn from_genesis(alloc: &GenesisAlloc) -> Self {
        let balances = alloc
            .iter()
            .map(|(address, account)| (*address, account.balance.clone().unwrap_or_default()))
            .collect();
        Self { balances }
    }

    /// All known accounts with their balances, ordered by address.
    pub fn accounts(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }
}

impl BalanceState for InMemoryState {
    fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).cloned().unwrap_or_default()
    }

    fn add_balance(&mut self, address: &Address, amount: &Amount) -> Result<(), StateError> {
        *self.balances.entry(*address).or_default() += amount;
        Ok(())
    }

    fn account_exists(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::GenesisAccount;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_credit_creates_account() {
        let mut state = InMemoryState::new();
        assert!(!state.account_exists(&addr(1)));
        assert!(state.balance(&addr(1)).is_zero());

        state.add_balance(&addr(1), &Amount::from(40)).unwrap();
        state.add_balance(&addr(1), &Amount::from(2)).unwrap();

        assert!(state.account_exists(&addr(1)));
        assert_eq!(state.balance(&addr(1)), Amount::from(42));
    }

    #[test]
    fn test_from_genesis_keeps_every_account() {
        let mut alloc = GenesisAlloc::new();
        alloc.insert(Address::ZERO, GenesisAccount::with_balance(Amount::from(500)));
        alloc.insert(addr(1), GenesisAccount::with_balance(Amount::from(100)));
        alloc.insert(addr(2), GenesisAccount::default());

        let state = InMemoryState::from_genesis(&alloc);
        assert_eq!(state.accounts().len(), 3);
        assert_eq!(state.balance(&Address::ZERO), Amount::from(500));
        assert!(state.account_exists(&addr(2)));
        assert!(state.balance(&addr(2)).is_zero());
    }
}
