//! Property-based tests for conversion and allocation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::allocation::AllocationUtil;
use super::conversion::convert_amount;

/// Positive amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Positive rates from 0.0001 to 10000.0000.
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

fn decimal_places() -> impl Strategy<Value = u32> {
    0u32..=3
}

fn weights() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((0i64..1_000_000i64).prop_map(|v| Decimal::new(v, 2)), 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Converted amounts never carry more than the target precision.
    #[test]
    fn prop_convert_respects_decimal_places(
        amount in positive_amount(),
        rate in positive_rate(),
        dp in decimal_places(),
    ) {
        let result = convert_amount(amount, rate, dp);
        prop_assert!(result.scale() <= dp, "{} has scale {}", result, result.scale());
    }

    /// Conversion rounds once: the error against the exact product is at most half a unit.
    #[test]
    fn prop_convert_error_bounded(
        amount in positive_amount(),
        rate in positive_rate(),
        dp in decimal_places(),
    ) {
        let exact = amount * rate;
        let result = convert_amount(amount, rate, dp);
        let half_unit = Decimal::new(5, dp + 1);
        prop_assert!((result - exact).abs() <= half_unit);
    }

    /// Allocation always sums to the rounded total.
    #[test]
    fn prop_allocation_sum_invariant(
        total in positive_amount(),
        weights in weights(),
        dp in decimal_places(),
    ) {
        let rounded_total = folio_shared::types::round_half_up(total, dp);
        let parts = AllocationUtil::allocate_by_weights(total, &weights, dp);
        prop_assert_eq!(parts.len(), weights.len());
        prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), rounded_total);
    }

    /// Allocation never produces a negative share of a positive total.
    #[test]
    fn prop_allocation_non_negative(
        total in positive_amount(),
        weights in weights(),
    ) {
        let parts = AllocationUtil::allocate_by_weights(total, &weights, 2);
        prop_assert!(parts.iter().all(|p| !p.is_sign_negative()));
    }

    /// Each share is within one unit of its exact proportional value.
    #[test]
    fn prop_allocation_close_to_exact(
        total in positive_amount(),
        weights in weights(),
    ) {
        let weight_sum: Decimal = weights.iter().copied().sum();
        prop_assume!(!weight_sum.is_zero());
        let parts = AllocationUtil::allocate_by_weights(total, &weights, 2);
        let unit = Decimal::new(1, 2);
        for (part, weight) in parts.iter().zip(&weights) {
            let exact = total * weight / weight_sum;
            prop_assert!((*part - exact).abs() <= unit, "{} vs {}", part, exact);
        }
    }
}
