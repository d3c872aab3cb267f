//! Sales returns booked against an invoice.
//!
//! Every posted return leaves a record, so a later return against the same
//! invoice can only take back what is still outstanding.

use folio_shared::types::{Currency, ProductId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::PostingError;
use super::event::LineItem;
use crate::inventory::LotConsumption;
use crate::ledger::ReferenceType;

/// A posted sales return and the invoice it was booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecord {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Return document id.
    pub return_id: Uuid,
    /// Invoice the goods were sold on.
    pub invoice_id: Uuid,
    /// Document currency.
    pub currency: Currency,
    /// Net value taken back.
    pub returned_subtotal: Decimal,
    /// Stocked items taken back.
    pub items: Vec<LineItem>,
}

impl ReturnRecord {
    /// Quantity of `product` taken back.
    #[must_use]
    pub fn quantity_of(&self, product: ProductId) -> Decimal {
        self.items
            .iter()
            .filter(|i| i.product_id == product)
            .map(|i| i.quantity)
            .sum()
    }
}

fn invalid(reason: String) -> PostingError {
    PostingError::InvalidEvent {
        event_type: ReferenceType::SalesReturn.as_str(),
        reason,
    }
}

/// Checks `record` against what the invoice sold and what `earlier` returns
/// already took back.
///
/// `sold` holds the invoice's FIFO draw. Items the invoice never drew are left
/// for the cost basis check.
///
/// # Errors
///
/// Returns `InvalidEvent` when the currency differs from earlier returns, or
/// when the subtotal or an item quantity exceeds what remains returnable.
pub fn check_return(
    record: &ReturnRecord,
    invoice_subtotal: Decimal,
    sold: &[LotConsumption],
    earlier: &[ReturnRecord],
) -> Result<(), PostingError> {
    if let Some(other) = earlier.iter().find(|r| r.currency != record.currency) {
        return Err(invalid(format!(
            "currency {} differs from {} on return {}",
            record.currency, other.currency, other.return_id
        )));
    }

    let returned: Decimal = earlier.iter().map(|r| r.returned_subtotal).sum();
    let open_subtotal = invoice_subtotal - returned;
    if record.returned_subtotal > open_subtotal {
        return Err(invalid(format!(
            "returned_subtotal {} exceeds the {open_subtotal} still returnable on invoice {}",
            record.returned_subtotal, record.invoice_id
        )));
    }

    for item in &record.items {
        let sold_quantity: Decimal = sold
            .iter()
            .filter(|c| c.product_id == item.product_id)
            .map(|c| c.quantity)
            .sum();
        if sold_quantity.is_zero() {
            continue;
        }
        let taken_back: Decimal = earlier.iter().map(|r| r.quantity_of(item.product_id)).sum();
        let open_quantity = sold_quantity - taken_back;
        if item.quantity > open_quantity {
            return Err(invalid(format!(
                "returned quantity {} of product {} exceeds the {open_quantity} still returnable \
                 ({sold_quantity} sold)",
                item.quantity, item.product_id
            )));
        }
    }
    Ok(())
}
