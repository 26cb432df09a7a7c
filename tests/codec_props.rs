//! Property tests for the allocation codec.

use armsplit::{
    assignments_from_counts, equal_allocation, parse_allocation, parse_allocation_counts, tally,
};
use proptest::prelude::*;

proptest! {
    /// Equal splits sum to the batch and never differ by more than one unit.
    #[test]
    fn equal_allocation_sums_and_balances(k in 1usize..50, batch in 0u64..10_000) {
        let counts = equal_allocation(k, batch);
        prop_assert_eq!(counts.len(), k);
        prop_assert_eq!(counts.iter().sum::<u64>(), batch);
        let max = *counts.iter().max().unwrap();
        let min = *counts.iter().min().unwrap();
        prop_assert!(max - min <= 1);
    }

    /// Largest-remainder apportionment returns non-negative integers summing
    /// exactly to the batch, each within one unit of the exact share.
    #[test]
    fn parse_allocation_is_within_one_of_exact_share(
        weights in proptest::collection::vec(0.01f64..1000.0, 1..20),
        batch in 1u64..100_000,
    ) {
        let counts = parse_allocation_counts(&weights, batch).unwrap();
        prop_assert_eq!(counts.len(), weights.len());
        prop_assert_eq!(counts.iter().sum::<u64>(), batch);

        let total: f64 = weights.iter().sum();
        for (i, &c) in counts.iter().enumerate() {
            let exact = weights[i] / total * batch as f64;
            prop_assert!(
                (c as f64 - exact).abs() <= 1.0 + 1e-9,
                "arm {}: count {} vs exact share {}",
                i, c, exact
            );
        }
    }

    /// Deterministic: the same weights always produce the same split.
    #[test]
    fn parse_allocation_is_deterministic(
        weights in proptest::collection::vec(0.01f64..1000.0, 1..20),
        batch in 1u64..10_000,
    ) {
        let a = parse_allocation_counts(&weights, batch).unwrap();
        let b = parse_allocation_counts(&weights, batch).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Fractional output preserves the batch total at any precision.
    #[test]
    fn parse_allocation_precision_preserves_total(
        weights in proptest::collection::vec(0.1f64..100.0, 1..10),
        batch in 1u64..1000,
        precision in 0u32..3,
    ) {
        let a = parse_allocation(&weights, batch, precision).unwrap();
        let sum: f64 = a.iter().sum();
        prop_assert!((sum - batch as f64).abs() < 1e-6, "sum={}", sum);
    }

    /// Counts expand to assignments and tally back to the same counts.
    #[test]
    fn assignment_round_trip(counts in proptest::collection::vec(0u64..50, 1..10)) {
        let assignments = assignments_from_counts(&counts);
        prop_assert_eq!(assignments.len() as u64, counts.iter().sum::<u64>());
        prop_assert_eq!(tally(&assignments, counts.len()), counts);
    }
}
