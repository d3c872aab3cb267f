//! Stock count reconciliation.
//!
//! A count that disagrees with the lots produces one adjustment dated on the
//! count day. Historical lots are never rewritten.

use chrono::NaiveDate;
use folio_shared::types::{ProductId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocator::{available_quantity, consume};
use super::error::InventoryError;
use super::lot::{Consumption, CostLot, LotSource};
use crate::ledger::SourceRef;

/// What a reconciliation did to the lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Book and counted quantities agree.
    Matched,
    /// Counted more than booked; a lot was appended.
    Surplus {
        /// The appended lot.
        lot: CostLot,
    },
    /// Counted less than booked; the difference was drawn oldest first.
    Shortage {
        /// The draw.
        consumption: Consumption,
    },
}

/// Outcome of reconciling one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Product counted.
    pub product_id: ProductId,
    /// Quantity on the lots before the count.
    pub book_quantity: Decimal,
    /// Quantity counted.
    pub counted_quantity: Decimal,
    /// Adjustment made.
    pub action: ReconcileAction,
}

impl Reconciliation {
    /// Counted minus booked.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.counted_quantity - self.book_quantity
    }

    /// Unrounded cost value of the adjustment, positive for a surplus.
    #[must_use]
    pub fn value(&self) -> Decimal {
        match &self.action {
            ReconcileAction::Matched => Decimal::ZERO,
            ReconcileAction::Surplus { lot } => lot.original_quantity * lot.unit_cost,
            ReconcileAction::Shortage { consumption } => -consumption.total_cost,
        }
    }
}

/// Brings `lots` in line with a physical count of `on_hand`.
///
/// A surplus is valued at the unit cost of the most recent lot. `sequence`
/// is the receipt order given to an appended lot.
///
/// # Errors
///
/// Returns `InvalidQuantity` for a negative count and `NoCostBasis` when a
/// surplus is found for a product without lots.
pub fn reconcile(
    tenant_id: TenantId,
    product_id: ProductId,
    lots: &mut [CostLot],
    on_hand: Decimal,
    date: NaiveDate,
    source: SourceRef,
    sequence: i64,
) -> Result<Reconciliation, InventoryError> {
    if on_hand.is_sign_negative() {
        return Err(InventoryError::InvalidQuantity(on_hand));
    }

    let book_quantity = available_quantity(lots);
    let drift = on_hand - book_quantity;

    let action = if drift.is_zero() {
        ReconcileAction::Matched
    } else if drift > Decimal::ZERO {
        let unit_cost = lots
            .iter()
            .max_by_key(|l| l.fifo_key())
            .map(|l| l.unit_cost)
            .ok_or(InventoryError::NoCostBasis(product_id))?;
        let lot = CostLot::new(
            tenant_id,
            product_id,
            drift,
            unit_cost,
            date,
            LotSource::Reconciliation,
        )
        .with_source_ref(source)
        .with_sequence(sequence);
        ReconcileAction::Surplus { lot }
    } else {
        let consumption = consume(product_id, lots, -drift)?;
        ReconcileAction::Shortage { consumption }
    };

    Ok(Reconciliation {
        product_id,
        book_quantity,
        counted_quantity: on_hand,
        action,
    })
}
