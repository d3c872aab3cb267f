//! FIFO draw, restore and weighted cost over a product's lots.
//!
//! Lots are drawn strictly oldest first: `lot_date`, then receipt sequence.

use folio_shared::types::ProductId;
use rust_decimal::Decimal;
use tracing::debug;

use super::error::InventoryError;
use super::lot::{Consumption, CostLot, LotConsumption, LotSlice};

/// Quantity still available across `lots`.
#[must_use]
pub fn available_quantity(lots: &[CostLot]) -> Decimal {
    lots.iter().map(|l| l.remaining_quantity).sum()
}

/// Draws `quantity` from `lots`, oldest first.
///
/// On error no lot is modified.
///
/// # Errors
///
/// Returns `InvalidQuantity` for a non-positive quantity and `InsufficientLots`
/// when the lots cannot cover it.
pub fn consume(
    product_id: ProductId,
    lots: &mut [CostLot],
    quantity: Decimal,
) -> Result<Consumption, InventoryError> {
    if quantity <= Decimal::ZERO {
        return Err(InventoryError::InvalidQuantity(quantity));
    }

    let available = available_quantity(lots);
    if available < quantity {
        return Err(InventoryError::InsufficientLots {
            product_id,
            requested: quantity,
            available,
        });
    }

    let mut order: Vec<usize> = (0..lots.len()).collect();
    order.sort_by_key(|&i| lots[i].fifo_key());

    let mut left = quantity;
    let mut consumption = Consumption {
        quantity,
        ..Consumption::default()
    };

    for i in order {
        if left.is_zero() {
            break;
        }
        let lot = &mut lots[i];
        if lot.is_exhausted() {
            continue;
        }

        let take = left.min(lot.remaining_quantity);
        lot.remaining_quantity -= take;
        left -= take;

        let slice = LotSlice {
            lot_id: lot.id,
            quantity: take,
            unit_cost: lot.unit_cost,
        };
        debug!(lot_id = %lot.id, quantity = %take, unit_cost = %lot.unit_cost, "FIFO slice");
        consumption.total_cost += slice.cost();
        consumption.slices.push(slice);
    }

    Ok(consumption)
}

/// Returns previously consumed quantities to their lots.
///
/// # Errors
///
/// Returns `LotNotFound` if a lot is missing and `InvalidQuantity` if a lot
/// would end up above its original quantity. On error no lot is modified.
pub fn restore(
    lots: &mut [CostLot],
    consumptions: &[LotConsumption],
) -> Result<(), InventoryError> {
    let mut updated: Vec<Decimal> = lots.iter().map(|l| l.remaining_quantity).collect();

    for c in consumptions {
        let idx = lots
            .iter()
            .position(|l| l.id == c.lot_id)
            .ok_or(InventoryError::LotNotFound(c.lot_id))?;
        updated[idx] += c.quantity;
        if updated[idx] > lots[idx].original_quantity {
            return Err(InventoryError::InvalidQuantity(updated[idx]));
        }
    }

    for (lot, remaining) in lots.iter_mut().zip(updated) {
        lot.remaining_quantity = remaining;
    }
    Ok(())
}

/// Average unit cost of a set of consumptions, `None` if they are empty.
#[must_use]
pub fn weighted_unit_cost(consumptions: &[LotConsumption]) -> Option<Decimal> {
    let quantity: Decimal = consumptions.iter().map(|c| c.quantity).sum();
    if quantity.is_zero() {
        return None;
    }
    let cost: Decimal = consumptions.iter().map(|c| c.quantity * c.unit_cost).sum();
    Some(cost / quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use folio_shared::types::TenantId;
    use rust_decimal_macros::dec;

    use crate::inventory::lot::LotSource;
    use crate::ledger::{ReferenceType, SourceRef};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn two_lots(product: ProductId) -> Vec<CostLot> {
        let tenant = TenantId::new();
        vec![
            CostLot::new(tenant, product, dec!(10), dec!(7), date(5), LotSource::Purchase)
                .with_sequence(2),
            CostLot::new(tenant, product, dec!(10), dec!(5), date(1), LotSource::Purchase)
                .with_sequence(1),
        ]
    }

    #[test]
    fn test_consume_spans_lots_oldest_first() {
        let product = ProductId::new();
        let mut lots = two_lots(product);

        let consumption = consume(product, &mut lots, dec!(15)).unwrap();

        assert_eq!(consumption.total_cost, dec!(85));
        assert_eq!(consumption.slices.len(), 2);
        assert_eq!(consumption.slices[0].unit_cost, dec!(5));
        assert_eq!(lots[1].remaining_quantity, dec!(0));
        assert_eq!(lots[0].remaining_quantity, dec!(5));
    }

    #[test]
    fn test_sequence_breaks_date_ties() {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut lots = vec![
            CostLot::new(tenant, product, dec!(1), dec!(9), date(1), LotSource::Purchase)
                .with_sequence(2),
            CostLot::new(tenant, product, dec!(1), dec!(3), date(1), LotSource::Purchase)
                .with_sequence(1),
        ];
        let consumption = consume(product, &mut lots, dec!(1)).unwrap();
        assert_eq!(consumption.total_cost, dec!(3));
    }

    #[test]
    fn test_insufficient_leaves_lots_untouched() {
        let product = ProductId::new();
        let mut lots = two_lots(product);
        let before = lots.clone();

        let err = consume(product, &mut lots, dec!(25)).unwrap_err();

        assert!(matches!(
            err,
            InventoryError::InsufficientLots { requested, available, .. }
                if requested == dec!(25) && available == dec!(20)
        ));
        assert_eq!(lots, before);
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let product = ProductId::new();
        let mut lots = two_lots(product);
        assert!(matches!(
            consume(product, &mut lots, dec!(0)),
            Err(InventoryError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_restore_undoes_consume() {
        let product = ProductId::new();
        let mut lots = two_lots(product);
        let before = lots.clone();
        let tenant = lots[0].tenant_id;
        let source = SourceRef::new(ReferenceType::Invoice, uuid::Uuid::new_v4());

        let consumption = consume(product, &mut lots, dec!(12)).unwrap();
        restore(&mut lots, &consumption.records(tenant, product, source)).unwrap();

        assert_eq!(lots, before);
    }

    #[test]
    fn test_restore_rejects_overflow() {
        let product = ProductId::new();
        let mut lots = two_lots(product);
        let tenant = lots[0].tenant_id;
        let bogus = LotConsumption {
            lot_id: lots[0].id,
            tenant_id: tenant,
            product_id: product,
            source: SourceRef::manual(),
            quantity: dec!(1),
            unit_cost: dec!(7),
        };
        assert!(restore(&mut lots, &[bogus]).is_err());
        assert_eq!(lots[0].remaining_quantity, dec!(10));
    }

    #[test]
    fn test_weighted_unit_cost() {
        let product = ProductId::new();
        let mut lots = two_lots(product);
        let tenant = lots[0].tenant_id;
        let consumption = consume(product, &mut lots, dec!(15)).unwrap();
        let records = consumption.records(tenant, product, SourceRef::manual());

        let avg = weighted_unit_cost(&records).unwrap();
        assert_eq!(avg.round_dp(4), dec!(5.6667));
        assert_eq!(weighted_unit_cost(&[]), None);
    }
}
