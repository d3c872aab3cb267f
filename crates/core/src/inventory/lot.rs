//! Cost lots and consumption records.

use chrono::NaiveDate;
use folio_shared::types::{LotId, ProductId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::SourceRef;

/// How a lot entered stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotSource {
    /// Bought from a supplier.
    Purchase,
    /// Manual stock adjustment.
    Adjustment,
    /// Surplus found by a stock count.
    Reconciliation,
    /// Goods returned by a customer.
    Return,
}

impl LotSource {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Adjustment => "adjustment",
            Self::Reconciliation => "reconciliation",
            Self::Return => "return",
        }
    }

    /// Parses a lot source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "adjustment" => Some(Self::Adjustment),
            "reconciliation" => Some(Self::Reconciliation),
            "return" => Some(Self::Return),
            _ => None,
        }
    }
}

/// A quantity of a product received at one unit cost.
///
/// `0 <= remaining_quantity <= original_quantity` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLot {
    /// Unique identifier.
    pub id: LotId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product held.
    pub product_id: ProductId,
    /// Receipt date, the primary FIFO key.
    pub lot_date: NaiveDate,
    /// Quantity received.
    pub original_quantity: Decimal,
    /// Quantity not yet consumed.
    pub remaining_quantity: Decimal,
    /// Cost per unit in base currency.
    pub unit_cost: Decimal,
    /// How the lot entered stock.
    pub source: LotSource,
    /// Document that created the lot.
    pub source_ref: Option<SourceRef>,
    /// Receipt order within the product, breaks ties on `lot_date`.
    pub sequence: i64,
}

impl CostLot {
    /// Creates a full lot.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
        lot_date: NaiveDate,
        source: LotSource,
    ) -> Self {
        Self {
            id: LotId::new(),
            tenant_id,
            product_id,
            lot_date,
            original_quantity: quantity,
            remaining_quantity: quantity,
            unit_cost,
            source,
            source_ref: None,
            sequence: 0,
        }
    }

    /// Records the originating document.
    #[must_use]
    pub fn with_source_ref(mut self, source_ref: SourceRef) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    /// Sets the receipt order.
    #[must_use]
    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Ordering key: oldest date first, then receipt order.
    #[must_use]
    pub fn fifo_key(&self) -> (NaiveDate, i64) {
        (self.lot_date, self.sequence)
    }

    /// Returns true if nothing remains.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Value of the remaining quantity.
    #[must_use]
    pub fn remaining_value(&self) -> Decimal {
        self.remaining_quantity * self.unit_cost
    }
}

/// A persisted draw on a lot, tagged with the consuming document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotConsumption {
    /// Lot drawn from.
    pub lot_id: LotId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product drawn.
    pub product_id: ProductId,
    /// Consuming document.
    pub source: SourceRef,
    /// Quantity drawn.
    pub quantity: Decimal,
    /// Unit cost of the lot at the time.
    pub unit_cost: Decimal,
}

/// One lot's share of a consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSlice {
    /// Lot drawn from.
    pub lot_id: LotId,
    /// Quantity drawn.
    pub quantity: Decimal,
    /// Unit cost of the lot.
    pub unit_cost: Decimal,
}

impl LotSlice {
    /// Cost of the slice.
    #[must_use]
    pub fn cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Result of drawing a quantity from a product's lots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Consumption {
    /// Sum of slice costs, unrounded.
    pub total_cost: Decimal,
    /// Quantity drawn.
    pub quantity: Decimal,
    /// Slices in consumption order.
    pub slices: Vec<LotSlice>,
}

impl Consumption {
    /// Converts the slices to persistable records.
    #[must_use]
    pub fn records(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        source: SourceRef,
    ) -> Vec<LotConsumption> {
        self.slices
            .iter()
            .map(|s| LotConsumption {
                lot_id: s.lot_id,
                tenant_id,
                product_id,
                source,
                quantity: s.quantity,
                unit_cost: s.unit_cost,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_lot_is_full() {
        let lot = CostLot::new(
            TenantId::new(),
            ProductId::new(),
            dec!(10),
            dec!(5),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            LotSource::Purchase,
        );
        assert_eq!(lot.remaining_quantity, lot.original_quantity);
        assert_eq!(lot.remaining_value(), dec!(50));
        assert!(!lot.is_exhausted());
    }

    #[test]
    fn test_slice_cost() {
        let slice = LotSlice {
            lot_id: LotId::new(),
            quantity: dec!(2.5),
            unit_cost: dec!(4),
        };
        assert_eq!(slice.cost(), dec!(10.0));
    }

    #[test]
    fn test_lot_source_parse() {
        assert_eq!(LotSource::parse("return"), Some(LotSource::Return));
        assert_eq!(LotSource::parse("gift"), None);
    }
}
