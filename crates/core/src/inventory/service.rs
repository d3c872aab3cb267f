//! Transactional FIFO operations over the lot store.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use folio_shared::types::{LotId, ProductId, TenantId};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::allocator;
use super::error::InventoryError;
use super::lot::{Consumption, CostLot, LotConsumption, LotSource};
use super::reconcile::{ReconcileAction, Reconciliation};
use crate::ledger::SourceRef;
use crate::store::LedgerTx;

fn next_sequence(lots: &[CostLot]) -> i64 {
    lots.iter().map(|l| l.sequence).max().unwrap_or(0) + 1
}

/// Stateless service reading and writing lots inside a caller's transaction.
pub struct InventoryService;

impl InventoryService {
    /// Appends a lot for `product`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `InvalidUnitCost` or a storage error.
    #[allow(clippy::too_many_arguments)]
    pub async fn receive<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        product: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
        date: NaiveDate,
        source: LotSource,
        source_ref: Option<SourceRef>,
    ) -> Result<CostLot, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        if unit_cost.is_sign_negative() {
            return Err(InventoryError::InvalidUnitCost(unit_cost));
        }

        let lots = tx.lots_for_update(tenant, product).await?;
        let mut lot = CostLot::new(tenant, product, quantity, unit_cost, date, source)
            .with_sequence(next_sequence(&lots));
        lot.source_ref = source_ref;
        tx.insert_lot(&lot).await?;

        info!(
            tenant_id = %tenant, product_id = %product, lot_id = %lot.id, %quantity, %unit_cost,
            "Lot received"
        );
        Ok(lot)
    }

    /// Draws `quantity` oldest first and records the draw against `source`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLots`, `InvalidQuantity` or a storage error.
    pub async fn consume<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        product: ProductId,
        quantity: Decimal,
        source: SourceRef,
    ) -> Result<Consumption, InventoryError> {
        let mut lots = tx.lots_for_update(tenant, product).await?;
        let consumption = allocator::consume(product, &mut lots, quantity)?;

        let touched: Vec<CostLot> = lots
            .into_iter()
            .filter(|l| consumption.slices.iter().any(|s| s.lot_id == l.id))
            .collect();
        tx.update_lots(&touched).await?;
        tx.insert_consumptions(&consumption.records(tenant, product, source))
            .await?;

        debug!(
            tenant_id = %tenant,
            product_id = %product,
            %quantity,
            total_cost = %consumption.total_cost,
            slices = consumption.slices.len(),
            "Lots consumed"
        );
        Ok(consumption)
    }

    /// Undoes every draw recorded against `source` and forgets the records.
    ///
    /// Returns the released records.
    ///
    /// # Errors
    ///
    /// Returns `LotNotFound`, `InvalidQuantity` or a storage error.
    pub async fn release<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        source: &SourceRef,
    ) -> Result<Vec<LotConsumption>, InventoryError> {
        let records = tx.consumptions(tenant, source).await?;
        if records.is_empty() {
            return Ok(records);
        }

        let mut by_product: BTreeMap<ProductId, Vec<LotConsumption>> = BTreeMap::new();
        for record in &records {
            by_product
                .entry(record.product_id)
                .or_default()
                .push(record.clone());
        }

        for (product, product_records) in by_product {
            let mut lots = tx.lots_for_update(tenant, product).await?;
            allocator::restore(&mut lots, &product_records)?;
            tx.update_lots(&lots).await?;
        }
        tx.delete_consumptions(tenant, source).await?;

        debug!(tenant_id = %tenant, %source, records = records.len(), "Lot consumption released");
        Ok(records)
    }

    /// Undoes the stock movement of `source`: its draws go back to their lots
    /// and the lots it created are deleted.
    ///
    /// # Errors
    ///
    /// Returns `LotAlreadyDrawn` when a created lot has been drawn from, or
    /// any error of [`Self::release`].
    pub async fn unwind<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        source: &SourceRef,
    ) -> Result<(), InventoryError> {
        let released = Self::release(tx, tenant, source).await?;

        let created = tx.lots_by_source(tenant, source).await?;
        if let Some(lot) = created.iter().find(|l| l.remaining_quantity < l.original_quantity) {
            return Err(InventoryError::LotAlreadyDrawn(lot.id));
        }
        let ids: Vec<LotId> = created.iter().map(|l| l.id).collect();
        if !ids.is_empty() {
            tx.delete_lots(tenant, &ids).await?;
        }

        info!(
            tenant_id = %tenant,
            %source,
            released = released.len(),
            deleted_lots = ids.len(),
            "Stock movement unwound"
        );
        Ok(())
    }

    /// Puts returned goods back into stock.
    ///
    /// Each `(source, product)` owns one return lot. A repost amends that lot
    /// in place; the new quantity may not drop below what was already drawn
    /// from it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `InvalidUnitCost` or a storage error.
    pub async fn restock_return<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        product: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
        date: NaiveDate,
        source: SourceRef,
    ) -> Result<CostLot, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        if unit_cost.is_sign_negative() {
            return Err(InventoryError::InvalidUnitCost(unit_cost));
        }

        let lots = tx.lots_for_update(tenant, product).await?;
        let existing = lots
            .iter()
            .find(|l| l.source == LotSource::Return && l.source_ref == Some(source))
            .cloned();

        let Some(mut lot) = existing else {
            let lot = CostLot::new(tenant, product, quantity, unit_cost, date, LotSource::Return)
                .with_source_ref(source)
                .with_sequence(next_sequence(&lots));
            tx.insert_lot(&lot).await?;
            return Ok(lot);
        };

        let drawn = lot.original_quantity - lot.remaining_quantity;
        if quantity < drawn {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        lot.original_quantity = quantity;
        lot.remaining_quantity = quantity - drawn;
        lot.unit_cost = unit_cost;
        lot.lot_date = date;
        tx.update_lots(std::slice::from_ref(&lot)).await?;
        Ok(lot)
    }

    /// Brings the product's lots in line with a stock count.
    ///
    /// # Errors
    ///
    /// See [`super::reconcile::reconcile`], plus storage errors.
    pub async fn reconcile<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        product: ProductId,
        on_hand: Decimal,
        date: NaiveDate,
        source: SourceRef,
    ) -> Result<Reconciliation, InventoryError> {
        let mut lots = tx.lots_for_update(tenant, product).await?;
        let sequence = next_sequence(&lots);
        let result = super::reconcile::reconcile(
            tenant, product, &mut lots, on_hand, date, source, sequence,
        )?;

        match &result.action {
            ReconcileAction::Matched => {}
            ReconcileAction::Surplus { lot } => tx.insert_lot(lot).await?,
            ReconcileAction::Shortage { consumption } => {
                let touched: Vec<CostLot> = lots
                    .into_iter()
                    .filter(|l| consumption.slices.iter().any(|s| s.lot_id == l.id))
                    .collect();
                tx.update_lots(&touched).await?;
                tx.insert_consumptions(&consumption.records(tenant, product, source))
                    .await?;
            }
        }

        info!(
            tenant_id = %tenant,
            product_id = %product,
            book = %result.book_quantity,
            counted = %on_hand,
            "Inventory reconciled"
        );
        Ok(result)
    }
}
