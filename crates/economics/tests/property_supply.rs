use issuance_economics::*;
use issuance_types::{Address, Amount};
use proptest::prelude::*;

// Property-based tests for the supply ledger
// Ensures arbitrary mint/burn sequences can never break the cap or the
// supply equation

#[derive(Debug, Clone)]
enum Op {
    Mint(u64),
    Burn(u64),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..=5_000).prop_map(Op::Mint),
        (0u64..=5_000).prop_map(Op::Burn),
    ]
}

proptest! {
    #[test]
    fn supply_equation_holds_for_any_sequence(
        initial in 0u64..=10_000,
        ops in prop::collection::vec(arbitrary_op(), 0..64),
    ) {
        let guard = AuthorizationGuard::new();
        let engine = guard.issue(SanctionedRole::ConsensusEngine);
        let policy = MonetaryPolicy::new(Amount::from(20_000), Amount::from(100)).unwrap();
        let ledger = SupplyLedger::new(Amount::from(initial), policy, guard).unwrap();

        let mut minted = 0u64;
        let mut burned = 0u64;
        let mut successes = 0usize;

        for (block, op) in ops.iter().enumerate() {
            let len_before = ledger.audit_len();
            let result = match op {
                Op::Mint(amount) => ledger.mint(*amount, block as u64, &engine),
                Op::Burn(amount) => ledger.burn(*amount, block as u64, &engine),
            };

            match (op, result) {
                (Op::Mint(amount), Ok(())) => { minted += amount; successes += 1; }
                (Op::Burn(amount), Ok(())) => { burned += amount; successes += 1; }
                (_, Err(_)) => prop_assert_eq!(ledger.audit_len(), len_before),
            }

            let total = ledger.total_supply();
            prop_assert!(total <= ledger.policy().max_supply);
            prop_assert_eq!(total, Amount::from(initial + minted - burned));
        }

        prop_assert_eq!(ledger.audit_len(), successes);
        prop_assert!(ledger.verify_audit_chain().is_ok());
    }
}

proptest! {
    #[test]
    fn mintable_is_bounded(
        current in 0u64..=2_000_000,
        max in 1u64..=1_000_000,
        nominal in 1u64..=10_000,
    ) {
        let current = Amount::from(current);
        let max = Amount::from(max);
        let nominal = Amount::from(nominal);

        let mintable = compute_mintable(&current, &max, &nominal);

        prop_assert!(mintable <= nominal);
        if current >= max {
            prop_assert!(mintable.is_zero());
        } else {
            prop_assert!(&current + &mintable <= max);
        }
    }
}

proptest! {
    #[test]
    fn fee_split_conserves_value(fees in any::<u64>()) {
        let split = split_fees(&Amount::from(fees));

        prop_assert_eq!(split.total(), Amount::from(fees));
        prop_assert!(split.producer_share >= split.owner_share);
        prop_assert!(&split.producer_share - &split.owner_share <= Amount::from(1));
    }
}

proptest! {
    #[test]
    fn premine_ignores_zero_address(
        balances in prop::collection::vec((1u8..=255, 0u64..=1_000_000), 0..16),
        zero_balance in any::<u64>(),
    ) {
        let mut alloc = GenesisAlloc::new();
        alloc.insert(Address::ZERO, GenesisAccount::with_balance(Amount::from(zero_balance)));

        for (byte, balance) in &balances {
            alloc.insert(Address::new([*byte; 20]), GenesisAccount::with_balance(Amount::from(*balance)));
        }

        let expected = alloc
            .iter()
            .filter(|(address, _)| !address.is_zero())
            .fold(0u128, |acc, (_, account)| {
                acc + account.balance.as_ref().and_then(Amount::to_u128).unwrap_or(0)
            });

        prop_assert_eq!(GenesisAccumulator::new().compute_total(&alloc), Amount::from_units(expected));
    }
}
