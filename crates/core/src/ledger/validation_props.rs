//! Property-based tests for journal line validation.
//!
//! - Accepted entries are balanced within tolerance
//! - Imbalances beyond tolerance are always rejected
//! - Reversing lines mirror the original

use proptest::prelude::*;
use rust_decimal::Decimal;
use folio_shared::types::AccountId;

use super::entry::NewLine;
use super::error::LedgerError;
use super::reversal::reversing_lines;
use super::validation::{EntryTotals, validate_lines};

/// Strategy to generate positive amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a set of debit amounts.
fn debit_amounts() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount(), 1..6)
}

fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Builds debit lines plus a single balancing credit, shifted by `skew`.
fn lines_with_skew(debits: &[Decimal], skew: Decimal) -> Vec<NewLine> {
    let total: Decimal = debits.iter().copied().sum();
    let mut lines: Vec<NewLine> = debits
        .iter()
        .map(|amount| NewLine::debit(AccountId::new(), *amount))
        .collect();
    lines.push(NewLine::credit(AccountId::new(), total + skew));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever validation accepts is balanced within tolerance.
    #[test]
    fn prop_accepted_entries_are_balanced(
        debits in debit_amounts(),
        skew_cents in -3i64..=3,
    ) {
        let lines = lines_with_skew(&debits, Decimal::new(skew_cents, 2));
        if let Ok(totals) = validate_lines(&lines, tolerance()) {
            prop_assert!(totals.difference() <= tolerance());
        }
    }

    /// Imbalances above tolerance are always rejected, never adjusted.
    #[test]
    fn prop_imbalance_rejected(
        debits in debit_amounts(),
        skew_cents in 2i64..10_000,
    ) {
        let skew = Decimal::new(skew_cents, 2);
        let lines = lines_with_skew(&debits, skew);
        let result = validate_lines(&lines, tolerance());
        prop_assert!(
            matches!(result, Err(LedgerError::Unbalanced { difference, .. }) if difference == skew),
            "expected Unbalanced, got {:?}",
            result
        );
    }

    /// Exactly balanced entries are accepted.
    #[test]
    fn prop_balanced_entries_accepted(debits in debit_amounts()) {
        let lines = lines_with_skew(&debits, Decimal::ZERO);
        let totals = validate_lines(&lines, tolerance());
        prop_assert!(totals.is_ok());
    }

    /// Reversing lines swap every side and keep the totals.
    #[test]
    fn prop_reversal_mirrors_original(debits in debit_amounts()) {
        let lines = lines_with_skew(&debits, Decimal::ZERO);
        let reversed = reversing_lines(&lines);

        prop_assert_eq!(reversed.len(), lines.len());
        for (original, reversal) in lines.iter().zip(&reversed) {
            prop_assert_eq!(original.account_id, reversal.account_id);
            prop_assert_eq!(original.debit, reversal.credit);
            prop_assert_eq!(original.credit, reversal.debit);
        }

        let before = EntryTotals::of(&lines);
        let after = EntryTotals::of(&reversed);
        prop_assert_eq!(before.debit, after.credit);
        prop_assert_eq!(before.credit, after.debit);
    }
}
