//! Amount allocation using the Largest Remainder Method.
//!
//! Ensures a split sums exactly to the original total (no cents lost):
//! 1. Calculate exact allocations
//! 2. Round each towards zero
//! 3. Calculate the remainder (total - sum of rounded)
//! 4. Distribute remainder units to items with the largest fractional parts

use folio_shared::types::round_half_up;
use rust_decimal::prelude::*;

/// Allocation utility for distributing amounts.
pub struct AllocationUtil;

impl AllocationUtil {
    /// Splits `total` proportionally to `weights`.
    ///
    /// The total is first rounded half-up to `decimal_places`; the result sums
    /// to exactly that value. Ties go to the earlier weight. When all weights
    /// are zero the whole amount goes to the first item.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use folio_core::currency::AllocationUtil;
    ///
    /// let weights = [dec!(1), dec!(1), dec!(1)];
    /// let result = AllocationUtil::allocate_by_weights(dec!(100), &weights, 2);
    /// assert_eq!(result, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
    /// ```
    #[must_use]
    pub fn allocate_by_weights(
        total: Decimal,
        weights: &[Decimal],
        decimal_places: u32,
    ) -> Vec<Decimal> {
        if weights.is_empty() {
            return vec![];
        }

        let total_rounded = round_half_up(total, decimal_places);
        if total_rounded.is_sign_negative() {
            return Self::allocate_by_weights(-total_rounded, weights, decimal_places)
                .into_iter()
                .map(|a| -a)
                .collect();
        }

        let weight_sum: Decimal = weights.iter().map(|w| w.abs()).sum();
        if weight_sum.is_zero() {
            let mut result = vec![Decimal::ZERO; weights.len()];
            result[0] = total_rounded;
            return result;
        }

        let unit = Decimal::new(1, decimal_places);

        // Calculate exact allocations
        let exact: Vec<Decimal> = weights
            .iter()
            .map(|w| total_rounded * w.abs() / weight_sum)
            .collect();

        // Round down each
        let mut rounded: Vec<Decimal> = exact
            .iter()
            .map(|a| a.round_dp_with_strategy(decimal_places, RoundingStrategy::ToZero))
            .collect();

        // How many units to distribute
        let sum_rounded: Decimal = rounded.iter().copied().sum();
        let units_to_distribute = ((total_rounded - sum_rounded) / unit)
            .round_dp_with_strategy(0, RoundingStrategy::ToZero)
            .to_usize()
            .unwrap_or(0);

        if units_to_distribute == 0 {
            return rounded;
        }

        // Largest fractional remainder first; stable sort keeps earlier items first on ties
        let mut remainders: Vec<(usize, Decimal)> = exact
            .iter()
            .zip(rounded.iter())
            .enumerate()
            .map(|(i, (e, r))| (i, *e - *r))
            .collect();
        remainders.sort_by(|a, b| b.1.cmp(&a.1));

        for (idx, _) in remainders.iter().cycle().take(units_to_distribute) {
            rounded[*idx] += unit;
        }

        rounded
    }
}
