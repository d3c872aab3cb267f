//! Row ↔ domain conversions.
//!
//! Enum-like columns are stored as their `as_str` form. A row that fails to
//! parse is reported as a database error.

use chrono::{DateTime, FixedOffset, Utc};
use folio_core::audit::{AuditAction, OutboxEvent};
use folio_core::currency::{ExchangeRate, RateSource};
use folio_core::fiscal::{AccountingPeriod, PeriodStatus};
use folio_core::inventory::{CostLot, LotConsumption, LotSource};
use folio_core::ledger::{
    Account, AccountSubtype, AccountType, DisplayAmount, EntryStatus, JournalEntry, JournalLine,
    NormalBalance, OriginalAmount, ReferenceType, SourceRef, TenantProfile,
};
use folio_core::posting::ReturnRecord;
use folio_core::restatement::{AmountRecord, RecordKey, RecordKind};
use folio_core::store::{StoreError, StoreResult};
use folio_core::workflow::{ApprovalRecord, ApprovalRequest, RequestKind, RequestStatus, UserRole};
use folio_shared::types::{
    AccountId, ApprovalRequestId, Currency, ExchangeRateId, JournalEntryId, JournalLineId, LotId,
    Money, OutboxEventId, PeriodId, ProductId, TenantId, UserId,
};
use rust_decimal::Decimal;
use sea_orm::Set;
use uuid::Uuid;

use crate::entities::{
    accounting_periods, accounts, amount_records, approval_requests, audit_outbox, cost_lots,
    exchange_rates, journal_entries, journal_lines, lot_consumptions, sales_returns, tenants,
};

fn column<T>(value: &str, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> StoreResult<T> {
    parse(value).ok_or_else(|| StoreError::Database(format!("invalid {name} '{value}'")))
}

fn currency(value: &str) -> StoreResult<Currency> {
    value.parse().map_err(StoreError::Database)
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.fixed_offset()
}

fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

const fn normal_balance_str(side: NormalBalance) -> &'static str {
    match side {
        NormalBalance::Debit => "debit",
        NormalBalance::Credit => "credit",
    }
}

fn normal_balance(value: &str) -> Option<NormalBalance> {
    match value {
        "debit" => Some(NormalBalance::Debit),
        "credit" => Some(NormalBalance::Credit),
        _ => None,
    }
}

fn display(
    currency_code: Option<&str>,
    amount: Option<Decimal>,
    rate: Option<Decimal>,
) -> StoreResult<Option<DisplayAmount>> {
    match (currency_code, amount, rate) {
        (Some(code), Some(amount), Some(rate)) => Ok(Some(DisplayAmount {
            currency: currency(code)?,
            amount,
            rate,
        })),
        _ => Ok(None),
    }
}

fn source_ref(kind: Option<&str>, id: Option<Uuid>) -> StoreResult<Option<SourceRef>> {
    kind.map(|kind| {
        Ok(SourceRef {
            reference_type: column(kind, "reference type", ReferenceType::parse)?,
            reference_id: id,
        })
    })
    .transpose()
}

fn json_error(err: serde_json::Error) -> StoreError {
    StoreError::Database(format!("invalid json column: {err}"))
}

// ============================================================================
// Tenants and accounts
// ============================================================================

pub(crate) fn tenant(row: tenants::Model) -> StoreResult<TenantProfile> {
    Ok(TenantProfile {
        tenant_id: TenantId::from_uuid(row.id),
        base_currency: currency(&row.base_currency)?,
        name: row.name,
    })
}

pub(crate) fn account(row: accounts::Model) -> StoreResult<Account> {
    Ok(Account {
        id: AccountId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        account_type: column(&row.account_type, "account type", AccountType::parse)?,
        subtype: row
            .subtype
            .as_deref()
            .map(|s| column(s, "account subtype", AccountSubtype::parse))
            .transpose()?,
        normal_balance: column(&row.normal_balance, "normal balance", normal_balance)?,
        is_active: row.is_active,
        parent_id: row.parent_id.map(AccountId::from_uuid),
        opening_balance: row.opening_balance,
        opening_balance_display: display(
            row.opening_display_currency.as_deref(),
            row.opening_display_amount,
            row.opening_display_rate,
        )?,
        code: row.code,
        name: row.name,
    })
}

/// Account row, used by seeding and tests.
pub fn account_model(account: &Account) -> accounts::ActiveModel {
    let shown = account.opening_balance_display;
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        tenant_id: Set(account.tenant_id.into_inner()),
        code: Set(account.code.clone()),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.as_str().to_string()),
        subtype: Set(account.subtype.map(|s| s.as_str().to_string())),
        normal_balance: Set(normal_balance_str(account.normal_balance).to_string()),
        is_active: Set(account.is_active),
        parent_id: Set(account.parent_id.map(AccountId::into_inner)),
        opening_balance: Set(account.opening_balance),
        opening_display_currency: Set(shown.map(|d| d.currency.to_string())),
        opening_display_amount: Set(shown.map(|d| d.amount)),
        opening_display_rate: Set(shown.map(|d| d.rate)),
    }
}

/// Tenant row, used by seeding and tests.
pub fn tenant_model(profile: &TenantProfile) -> tenants::ActiveModel {
    tenants::ActiveModel {
        id: Set(profile.tenant_id.into_inner()),
        name: Set(profile.name.clone()),
        base_currency: Set(profile.base_currency.to_string()),
        created_at: Set(timestamp(Utc::now())),
    }
}

// ============================================================================
// Periods and journal
// ============================================================================

pub(crate) fn period(row: accounting_periods::Model) -> StoreResult<AccountingPeriod> {
    Ok(AccountingPeriod {
        id: PeriodId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        status: column(&row.status, "period status", PeriodStatus::parse)?,
        name: row.name,
        start_date: row.start_date,
        end_date: row.end_date,
    })
}

pub(crate) fn period_model(period: &AccountingPeriod) -> accounting_periods::ActiveModel {
    accounting_periods::ActiveModel {
        id: Set(period.id.into_inner()),
        tenant_id: Set(period.tenant_id.into_inner()),
        name: Set(period.name.clone()),
        start_date: Set(period.start_date),
        end_date: Set(period.end_date),
        status: Set(period.status.as_str().to_string()),
    }
}

pub(crate) fn entry(row: journal_entries::Model) -> StoreResult<JournalEntry> {
    Ok(JournalEntry {
        id: JournalEntryId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        entry_date: row.entry_date,
        reference: SourceRef {
            reference_type: column(&row.reference_type, "reference type", ReferenceType::parse)?,
            reference_id: row.reference_id,
        },
        status: column(&row.status, "entry status", EntryStatus::parse)?,
        is_deleted: row.is_deleted,
        reversal_of: row.reversal_of.map(JournalEntryId::from_uuid),
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
        description: row.description,
    })
}

pub(crate) fn entry_model(entry: &JournalEntry) -> journal_entries::ActiveModel {
    journal_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(entry.tenant_id.into_inner()),
        entry_date: Set(entry.entry_date),
        reference_type: Set(entry.reference.reference_type.as_str().to_string()),
        reference_id: Set(entry.reference.reference_id),
        description: Set(entry.description.clone()),
        status: Set(entry.status.as_str().to_string()),
        is_deleted: Set(entry.is_deleted),
        reversal_of: Set(entry.reversal_of.map(JournalEntryId::into_inner)),
        created_at: Set(timestamp(entry.created_at)),
        updated_at: Set(timestamp(entry.updated_at)),
    }
}

pub(crate) fn line(row: journal_lines::Model) -> StoreResult<JournalLine> {
    let stored = (
        row.original_currency.as_deref(),
        row.original_amount,
        row.original_rate,
    );
    let original = match stored {
        (Some(code), Some(amount), Some(rate)) => Some(OriginalAmount {
            currency: currency(code)?,
            amount,
            rate,
        }),
        _ => None,
    };
    Ok(JournalLine {
        id: JournalLineId::from_uuid(row.id),
        entry_id: JournalEntryId::from_uuid(row.entry_id),
        account_id: AccountId::from_uuid(row.account_id),
        debit: row.debit,
        credit: row.credit,
        original,
        display: display(row.display_currency.as_deref(), row.display_amount, row.display_rate)?,
        description: row.description,
    })
}

pub(crate) fn line_model(line: &JournalLine, line_no: usize) -> journal_lines::ActiveModel {
    journal_lines::ActiveModel {
        id: Set(line.id.into_inner()),
        entry_id: Set(line.entry_id.into_inner()),
        line_no: Set(i32::try_from(line_no).unwrap_or(i32::MAX)),
        account_id: Set(line.account_id.into_inner()),
        debit: Set(line.debit),
        credit: Set(line.credit),
        original_currency: Set(line.original.map(|o| o.currency.to_string())),
        original_amount: Set(line.original.map(|o| o.amount)),
        original_rate: Set(line.original.map(|o| o.rate)),
        display_currency: Set(line.display.map(|d| d.currency.to_string())),
        display_amount: Set(line.display.map(|d| d.amount)),
        display_rate: Set(line.display.map(|d| d.rate)),
        description: Set(line.description.clone()),
    }
}

// ============================================================================
// Rates and lots
// ============================================================================

pub(crate) fn rate(row: exchange_rates::Model) -> StoreResult<ExchangeRate> {
    Ok(ExchangeRate {
        id: ExchangeRateId::from_uuid(row.id),
        tenant_id: row.tenant_id.map(TenantId::from_uuid),
        from_currency: currency(&row.from_currency)?,
        to_currency: currency(&row.to_currency)?,
        rate: row.rate,
        effective_date: row.effective_date,
        source: column(&row.source, "rate source", RateSource::parse)?,
        manual_override: row.manual_override,
        override_reason: row.override_reason,
        created_at: utc(row.created_at),
    })
}

pub(crate) fn rate_model(rate: &ExchangeRate) -> exchange_rates::ActiveModel {
    exchange_rates::ActiveModel {
        id: Set(rate.id.into_inner()),
        tenant_id: Set(rate.tenant_id.map(TenantId::into_inner)),
        from_currency: Set(rate.from_currency.to_string()),
        to_currency: Set(rate.to_currency.to_string()),
        rate: Set(rate.rate),
        effective_date: Set(rate.effective_date),
        source: Set(rate.source.as_str().to_string()),
        manual_override: Set(rate.manual_override),
        override_reason: Set(rate.override_reason.clone()),
        created_at: Set(timestamp(rate.created_at)),
    }
}

pub(crate) fn lot(row: cost_lots::Model) -> StoreResult<CostLot> {
    Ok(CostLot {
        id: LotId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        product_id: ProductId::from_uuid(row.product_id),
        lot_date: row.lot_date,
        original_quantity: row.original_quantity,
        remaining_quantity: row.remaining_quantity,
        unit_cost: row.unit_cost,
        source: column(&row.source, "lot source", LotSource::parse)?,
        source_ref: source_ref(row.source_ref_type.as_deref(), row.source_ref_id)?,
        sequence: row.sequence,
    })
}

pub(crate) fn lot_model(lot: &CostLot) -> cost_lots::ActiveModel {
    cost_lots::ActiveModel {
        id: Set(lot.id.into_inner()),
        tenant_id: Set(lot.tenant_id.into_inner()),
        product_id: Set(lot.product_id.into_inner()),
        lot_date: Set(lot.lot_date),
        original_quantity: Set(lot.original_quantity),
        remaining_quantity: Set(lot.remaining_quantity),
        unit_cost: Set(lot.unit_cost),
        source: Set(lot.source.as_str().to_string()),
        source_ref_type: Set(lot.source_ref.map(|r| r.reference_type.as_str().to_string())),
        source_ref_id: Set(lot.source_ref.and_then(|r| r.reference_id)),
        sequence: Set(lot.sequence),
    }
}

pub(crate) fn consumption(row: lot_consumptions::Model) -> StoreResult<LotConsumption> {
    Ok(LotConsumption {
        lot_id: LotId::from_uuid(row.lot_id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        product_id: ProductId::from_uuid(row.product_id),
        source: SourceRef {
            reference_type: column(&row.source_type, "reference type", ReferenceType::parse)?,
            reference_id: row.source_id,
        },
        quantity: row.quantity,
        unit_cost: row.unit_cost,
    })
}

pub(crate) fn consumption_model(record: &LotConsumption) -> lot_consumptions::ActiveModel {
    lot_consumptions::ActiveModel {
        // v7 ids keep draw order
        id: Set(Uuid::now_v7()),
        lot_id: Set(record.lot_id.into_inner()),
        tenant_id: Set(record.tenant_id.into_inner()),
        product_id: Set(record.product_id.into_inner()),
        source_type: Set(record.source.reference_type.as_str().to_string()),
        source_id: Set(record.source.reference_id),
        quantity: Set(record.quantity),
        unit_cost: Set(record.unit_cost),
    }
}

// ============================================================================
// Approvals, restatement, audit
// ============================================================================

pub(crate) fn sales_return(row: sales_returns::Model) -> StoreResult<ReturnRecord> {
    Ok(ReturnRecord {
        tenant_id: TenantId::from_uuid(row.tenant_id),
        return_id: row.return_id,
        invoice_id: row.invoice_id,
        currency: currency(&row.currency)?,
        returned_subtotal: row.returned_subtotal,
        items: serde_json::from_value(row.items).map_err(json_error)?,
    })
}

pub(crate) fn sales_return_model(record: &ReturnRecord) -> StoreResult<sales_returns::ActiveModel> {
    Ok(sales_returns::ActiveModel {
        tenant_id: Set(record.tenant_id.into_inner()),
        return_id: Set(record.return_id),
        invoice_id: Set(record.invoice_id),
        currency: Set(record.currency.to_string()),
        returned_subtotal: Set(record.returned_subtotal),
        items: Set(serde_json::to_value(&record.items).map_err(json_error)?),
        updated_at: Set(timestamp(Utc::now())),
    })
}

pub(crate) fn request(row: approval_requests::Model) -> StoreResult<ApprovalRequest> {
    let required_approvers: Vec<UserRole> =
        serde_json::from_value(row.required_approvers).map_err(json_error)?;
    let approvals: Vec<ApprovalRecord> = serde_json::from_value(row.approvals).map_err(json_error)?;
    Ok(ApprovalRequest {
        id: ApprovalRequestId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        kind: column(&row.kind, "request kind", RequestKind::parse)?,
        amount: row.amount,
        currency: currency(&row.currency)?,
        source_document: source_ref(row.source_type.as_deref(), row.source_id)?,
        status: column(&row.status, "request status", RequestStatus::parse)?,
        required_approvers,
        approvals,
        disbursement_voucher: row.disbursement_voucher.map(JournalEntryId::from_uuid),
        rejection_reason: row.rejection_reason,
        created_by: UserId::from_uuid(row.created_by),
        created_at: utc(row.created_at),
        updated_at: utc(row.updated_at),
    })
}

pub(crate) fn request_model(
    request: &ApprovalRequest,
) -> StoreResult<approval_requests::ActiveModel> {
    Ok(approval_requests::ActiveModel {
        id: Set(request.id.into_inner()),
        tenant_id: Set(request.tenant_id.into_inner()),
        kind: Set(request.kind.as_str().to_string()),
        amount: Set(request.amount),
        currency: Set(request.currency.to_string()),
        source_type: Set(request
            .source_document
            .map(|r| r.reference_type.as_str().to_string())),
        source_id: Set(request.source_document.and_then(|r| r.reference_id)),
        status: Set(request.status.as_str().to_string()),
        required_approvers: Set(
            serde_json::to_value(&request.required_approvers).map_err(json_error)?,
        ),
        approvals: Set(serde_json::to_value(&request.approvals).map_err(json_error)?),
        disbursement_voucher: Set(request.disbursement_voucher.map(JournalEntryId::into_inner)),
        rejection_reason: Set(request.rejection_reason.clone()),
        created_by: Set(request.created_by.into_inner()),
        created_at: Set(timestamp(request.created_at)),
        updated_at: Set(timestamp(request.updated_at)),
    })
}

pub(crate) fn document(row: amount_records::Model) -> StoreResult<AmountRecord> {
    Ok(AmountRecord {
        key: RecordKey::new(column(&row.kind, "record kind", RecordKind::parse)?, row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        original: Money::new(row.amount, currency(&row.currency)?),
        display: display(row.display_currency.as_deref(), row.display_amount, row.display_rate)?,
    })
}

/// Amount-bearing document row, used by seeding and tests.
pub fn document_model(record: &AmountRecord) -> amount_records::ActiveModel {
    amount_records::ActiveModel {
        kind: Set(record.key.kind.as_str().to_string()),
        id: Set(record.key.id),
        tenant_id: Set(record.tenant_id.into_inner()),
        amount: Set(record.original.amount),
        currency: Set(record.original.currency.to_string()),
        display_currency: Set(record.display.map(|d| d.currency.to_string())),
        display_amount: Set(record.display.map(|d| d.amount)),
        display_rate: Set(record.display.map(|d| d.rate)),
    }
}

pub(crate) fn outbox_event(row: audit_outbox::Model) -> StoreResult<OutboxEvent> {
    Ok(OutboxEvent {
        id: OutboxEventId::from_uuid(row.id),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        action: column(&row.action, "audit action", AuditAction::parse)?,
        subject_id: row.subject_id,
        actor: row.actor.map(UserId::from_uuid),
        payload: row.payload,
        created_at: utc(row.created_at),
        delivered_at: row.delivered_at.map(utc),
    })
}

pub(crate) fn outbox_model(event: &OutboxEvent) -> audit_outbox::ActiveModel {
    audit_outbox::ActiveModel {
        id: Set(event.id.into_inner()),
        tenant_id: Set(event.tenant_id.into_inner()),
        action: Set(event.action.as_str().to_string()),
        subject_id: Set(event.subject_id),
        actor: Set(event.actor.map(UserId::into_inner)),
        payload: Set(event.payload.clone()),
        created_at: Set(timestamp(event.created_at)),
        delivered_at: Set(event.delivered_at.map(timestamp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::ActiveValue;

    fn value<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        value.unwrap()
    }

    #[test]
    fn test_display_needs_all_three_columns() {
        assert_eq!(display(Some("EUR"), Some(dec!(5)), None).unwrap(), None);
        let shown = display(Some("EUR"), Some(dec!(5)), Some(dec!(0.5))).unwrap().unwrap();
        assert_eq!(shown.currency, Currency::EUR);
    }

    #[test]
    fn test_bad_enum_value_is_a_database_error() {
        let err = column("sideways", "normal balance", normal_balance).unwrap_err();
        assert_eq!(err, StoreError::Database("invalid normal balance 'sideways'".into()));
    }

    #[test]
    fn test_manual_source_ref_keeps_null_id() {
        let reference = source_ref(Some("manual"), None).unwrap().unwrap();
        assert_eq!(reference, SourceRef::manual());
        assert_eq!(source_ref(None, Some(Uuid::nil())).unwrap(), None);
    }

    #[test]
    fn test_lot_row_round_trip() {
        let lot = CostLot::new(
            TenantId::new(),
            ProductId::new(),
            dec!(10),
            dec!(4.25),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            LotSource::Return,
        )
        .with_source_ref(SourceRef::new(ReferenceType::SalesReturn, Uuid::new_v4()))
        .with_sequence(7);

        let row = lot_model(&lot);
        let model = cost_lots::Model {
            id: value(row.id),
            tenant_id: value(row.tenant_id),
            product_id: value(row.product_id),
            lot_date: value(row.lot_date),
            original_quantity: value(row.original_quantity),
            remaining_quantity: value(row.remaining_quantity),
            unit_cost: value(row.unit_cost),
            source: value(row.source),
            source_ref_type: value(row.source_ref_type),
            source_ref_id: value(row.source_ref_id),
            sequence: value(row.sequence),
        };
        assert_eq!(model.source, "return");
        assert_eq!(super::lot(model).unwrap(), lot);
    }
}
