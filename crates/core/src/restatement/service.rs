//! Display-currency restatement.
//!
//! `display = round(original × rate)` to the target currency's decimals. The
//! original amount, currency and any posted value are never written.

use folio_shared::config::LedgerConfig;
use folio_shared::types::{Currency, TenantId};
use rust_decimal::Decimal;
use tracing::info;

use super::record::{AmountRecord, RestatementSummary};
use crate::currency::{CurrencyError, convert_amount};
use crate::ledger::DisplayAmount;
use crate::store::LedgerTx;

/// Computes the display amount of one record.
///
/// # Errors
///
/// Returns `InvalidRate` unless `rate` is positive.
pub fn restated(
    record: &AmountRecord,
    target: Currency,
    rate: Decimal,
    decimals: u32,
) -> Result<DisplayAmount, CurrencyError> {
    if rate <= Decimal::ZERO {
        return Err(CurrencyError::InvalidRate(rate));
    }
    Ok(DisplayAmount {
        currency: target,
        amount: convert_amount(record.original.amount, rate, decimals),
        rate,
    })
}

/// Restates and resets display amounts for a tenant.
#[derive(Debug, Clone)]
pub struct RestatementService {
    ledger: LedgerConfig,
}

impl RestatementService {
    /// Creates the service.
    #[must_use]
    pub fn new(ledger: LedgerConfig) -> Self {
        Self { ledger }
    }

    /// Writes display amounts in `target` for every amount record of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRate` unless `rate` is positive, or a storage error.
    pub async fn restate<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        target: Currency,
        rate: Decimal,
    ) -> Result<RestatementSummary, CurrencyError> {
        if rate <= Decimal::ZERO {
            return Err(CurrencyError::InvalidRate(rate));
        }

        let decimals = self.ledger.decimals_for(target);
        let mut summary = RestatementSummary::default();

        for record in tx.amount_records(tenant).await? {
            let display = restated(&record, target, rate, decimals)?;
            tx.set_display(tenant, &record.key, Some(&display)).await?;
            summary.record(record.key.kind);
        }

        info!(
            tenant_id = %tenant, currency = %target, %rate, records = summary.total(),
            "Amounts restated"
        );
        Ok(summary)
    }

    /// Clears every display amount of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn reset<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
    ) -> Result<RestatementSummary, CurrencyError> {
        let mut summary = RestatementSummary::default();

        for record in tx.amount_records(tenant).await? {
            if record.display.is_none() {
                continue;
            }
            tx.set_display(tenant, &record.key, None).await?;
            summary.record(record.key.kind);
        }

        info!(tenant_id = %tenant, records = summary.total(), "Restatement reset");
        Ok(summary)
    }
}
