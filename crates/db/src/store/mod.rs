//! PostgreSQL [`LedgerStore`] backed by `SeaORM`.
//!
//! One [`PgTx`] wraps one database transaction. Tenant isolation comes from
//! explicit `tenant_id` filters on every tenant-scoped query.

pub mod convert;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use folio_core::audit::OutboxEvent;
use folio_core::currency::ExchangeRate;
use folio_core::fiscal::{AccountingPeriod, PeriodStatus};
use folio_core::inventory::{CostLot, LotConsumption};
use folio_core::ledger::{
    Account, AccountSubtype, DisplayAmount, JournalEntry, JournalLine, ReferenceType, SourceRef,
    TenantProfile,
};
use folio_core::posting::ReturnRecord;
use folio_core::restatement::{AmountRecord, RecordKey, RecordKind};
use folio_core::store::{LedgerStore, LedgerTx, StoreError, StoreResult};
use folio_core::workflow::ApprovalRequest;
use folio_shared::types::{
    AccountId, ApprovalRequestId, Currency, JournalEntryId, LotId, Money, OutboxEventId, PeriodId,
    ProductId, TenantId,
};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    accounting_periods, accounts, amount_records, approval_requests, audit_outbox, cost_lots,
    exchange_rates, journal_entries, journal_lines, lot_consumptions, sales_returns,
    source_document_links, tenants,
};

/// Maps a driver error onto the storage error the engine understands.
///
/// Unique violations become `Conflict` so the engine can retry.
pub fn db_err(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Conflict(detail);
    }
    StoreError::Database(err.to_string())
}

fn updated(err: DbErr, what: &str, id: impl std::fmt::Display) -> StoreError {
    match err {
        DbErr::RecordNotUpdated => StoreError::NotFound(format!("{what} {id}")),
        other => db_err(other),
    }
}

/// PostgreSQL ledger store.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Wraps an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Registers a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn add_tenant(&self, profile: &TenantProfile) -> StoreResult<()> {
        tenants::Entity::insert(convert::tenant_model(profile))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Adds an account to a tenant's chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, e.g. on a duplicate code.
    pub async fn add_account(&self, account: &Account) -> StoreResult<()> {
        accounts::Entity::insert(convert::account_model(account))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Adds an amount-bearing source document.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn add_document(&self, record: &AmountRecord) -> StoreResult<()> {
        amount_records::Entity::insert(convert::document_model(record))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(PgTx { txn })
    }
}

/// Transaction over a [`PgStore`].
///
/// Dropping it without `commit` rolls the database transaction back.
#[derive(Debug)]
pub struct PgTx {
    txn: DatabaseTransaction,
}

impl PgTx {
    async fn insert_lines(&self, lines: &[JournalLine]) -> StoreResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let rows = lines
            .iter()
            .enumerate()
            .map(|(line_no, line)| convert::line_model(line, line_no));
        journal_lines::Entity::insert_many(rows)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn base_currency(&self, tenant: TenantId) -> StoreResult<Currency> {
        let row = tenants::Entity::find_by_id(tenant.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant}")))?;
        Ok(convert::tenant(row)?.base_currency)
    }

    async fn live_line(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> StoreResult<Option<journal_lines::Model>> {
        journal_lines::Entity::find_by_id(id)
            .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .filter(journal_entries::Column::IsDeleted.eq(false))
            .one(&self.txn)
            .await
            .map_err(db_err)
    }
}

fn reference_filter(
    type_column: impl ColumnTrait,
    id_column: impl ColumnTrait,
    reference: &SourceRef,
) -> Condition {
    let by_type = Condition::all().add(type_column.eq(reference.reference_type.as_str()));
    match reference.reference_id {
        Some(id) => by_type.add(id_column.eq(id)),
        None => by_type.add(id_column.is_null()),
    }
}

fn display_columns(
    display: Option<&DisplayAmount>) -> (Option<String>, Option<Decimal>, Option<Decimal>,
) {
    (
        display.map(|d| d.currency.to_string()),
        display.map(|d| d.amount),
        display.map(|d| d.rate),
    )
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn tenant(&mut self, tenant: TenantId) -> StoreResult<Option<TenantProfile>> {
        tenants::Entity::find_by_id(tenant.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::tenant)
            .transpose()
    }

    async fn accounts(&mut self, tenant: TenantId) -> StoreResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::account)
            .collect()
    }

    async fn account(&mut self, id: AccountId) -> StoreResult<Option<Account>> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn account_by_subtype(
        &mut self,
        tenant: TenantId,
        subtype: AccountSubtype,
    ) -> StoreResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant.into_inner()))
            .filter(accounts::Column::IsActive.eq(true))
            .filter(accounts::Column::Subtype.eq(subtype.as_str()))
            .order_by_asc(accounts::Column::Code)
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn periods(&mut self, tenant: TenantId) -> StoreResult<Vec<AccountingPeriod>> {
        accounting_periods::Entity::find()
            .filter(accounting_periods::Column::TenantId.eq(tenant.into_inner()))
            .order_by_asc(accounting_periods::Column::StartDate)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::period)
            .collect()
    }

    async fn insert_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        accounting_periods::Entity::insert(convert::period_model(period))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_period_status(
        &mut self,
        period: PeriodId,
        status: PeriodStatus,
    ) -> StoreResult<()> {
        let result = accounting_periods::Entity::update_many()
            .col_expr(accounting_periods::Column::Status, Expr::value(status.as_str()))
            .filter(accounting_periods::Column::Id.eq(period.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("period {period}")));
        }
        Ok(())
    }

    async fn entry(
        &mut self,
        tenant: TenantId,
        id: JournalEntryId,
    ) -> StoreResult<Option<JournalEntry>> {
        journal_entries::Entity::find_by_id(id.into_inner())
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::entry)
            .transpose()
    }

    async fn entry_by_reference(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
    ) -> StoreResult<Option<JournalEntry>> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .filter(journal_entries::Column::IsDeleted.eq(false))
            .filter(reference_filter(
                journal_entries::Column::ReferenceType,
                journal_entries::Column::ReferenceId,
                reference,
            ))
            .order_by_asc(journal_entries::Column::CreatedAt)
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::entry)
            .transpose()
    }

    async fn entries(&mut self, tenant: TenantId) -> StoreResult<Vec<JournalEntry>> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .filter(journal_entries::Column::IsDeleted.eq(false))
            .order_by_asc(journal_entries::Column::CreatedAt)
            .order_by_asc(journal_entries::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::entry)
            .collect()
    }

    async fn lines(&mut self, entry: JournalEntryId) -> StoreResult<Vec<JournalLine>> {
        journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(entry.into_inner()))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::line)
            .collect()
    }

    async fn insert_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> StoreResult<()> {
        journal_entries::Entity::insert(convert::entry_model(entry))
            .exec_without_returning(&self.txn)
            .await
            .map_err(|err| match db_err(err) {
                StoreError::Conflict(_) => {
                    tracing::debug!(
                        reference = %entry.reference,
                        "Live entry already holds reference"
                    );
                    StoreError::Conflict(format!("entry for {} already exists", entry.reference))
                }
                other => other,
            })?;
        self.insert_lines(lines).await
    }

    async fn update_entry(&mut self, entry: &JournalEntry) -> StoreResult<()> {
        convert::entry_model(entry)
            .update(&self.txn)
            .await
            .map_err(|e| updated(e, "entry", entry.id))?;
        Ok(())
    }

    async fn replace_lines(
        &mut self,
        entry: JournalEntryId,
        lines: &[JournalLine],
    ) -> StoreResult<()> {
        let exists = journal_entries::Entity::find_by_id(entry.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(format!("entry {entry}")));
        }

        journal_lines::Entity::delete_many()
            .filter(journal_lines::Column::EntryId.eq(entry.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        self.insert_lines(lines).await
    }

    async fn rates(
        &mut self,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        on_or_before: NaiveDate,
    ) -> StoreResult<Vec<ExchangeRate>> {
        exchange_rates::Entity::find()
            .filter(exchange_rates::Column::FromCurrency.eq(from.as_str()))
            .filter(exchange_rates::Column::ToCurrency.eq(to.as_str()))
            .filter(exchange_rates::Column::EffectiveDate.lte(on_or_before))
            .filter(
                Condition::any()
                    .add(exchange_rates::Column::TenantId.eq(tenant.into_inner()))
                    .add(exchange_rates::Column::TenantId.is_null()),
            )
            .order_by_desc(exchange_rates::Column::EffectiveDate)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::rate)
            .collect()
    }

    async fn insert_rate(&mut self, rate: &ExchangeRate) -> StoreResult<()> {
        exchange_rates::Entity::insert(convert::rate_model(rate))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn lots_for_update(
        &mut self,
        tenant: TenantId,
        product: ProductId,
    ) -> StoreResult<Vec<CostLot>> {
        cost_lots::Entity::find()
            .filter(cost_lots::Column::TenantId.eq(tenant.into_inner()))
            .filter(cost_lots::Column::ProductId.eq(product.into_inner()))
            .order_by_asc(cost_lots::Column::LotDate)
            .order_by_asc(cost_lots::Column::Sequence)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::lot)
            .collect()
    }

    async fn insert_lot(&mut self, lot: &CostLot) -> StoreResult<()> {
        cost_lots::Entity::insert(convert::lot_model(lot))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_lots(&mut self, lots: &[CostLot]) -> StoreResult<()> {
        for lot in lots {
            convert::lot_model(lot)
                .update(&self.txn)
                .await
                .map_err(|e| updated(e, "lot", lot.id))?;
        }
        Ok(())
    }

    async fn consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<LotConsumption>> {
        lot_consumptions::Entity::find()
            .filter(lot_consumptions::Column::TenantId.eq(tenant.into_inner()))
            .filter(reference_filter(
                lot_consumptions::Column::SourceType,
                lot_consumptions::Column::SourceId,
                source,
            ))
            .order_by_asc(lot_consumptions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::consumption)
            .collect()
    }

    async fn insert_consumptions(&mut self, records: &[LotConsumption]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        lot_consumptions::Entity::insert_many(records.iter().map(convert::consumption_model))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<()> {
        lot_consumptions::Entity::delete_many()
            .filter(lot_consumptions::Column::TenantId.eq(tenant.into_inner()))
            .filter(reference_filter(
                lot_consumptions::Column::SourceType,
                lot_consumptions::Column::SourceId,
                source,
            ))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn lots_by_source(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<CostLot>> {
        cost_lots::Entity::find()
            .filter(cost_lots::Column::TenantId.eq(tenant.into_inner()))
            .filter(reference_filter(
                cost_lots::Column::SourceRefType,
                cost_lots::Column::SourceRefId,
                source,
            ))
            .order_by_asc(cost_lots::Column::Sequence)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::lot)
            .collect()
    }

    async fn delete_lots(&mut self, tenant: TenantId, ids: &[LotId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        cost_lots::Entity::delete_many()
            .filter(cost_lots::Column::TenantId.eq(tenant.into_inner()))
            .filter(cost_lots::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn sales_returns(
        &mut self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> StoreResult<Vec<ReturnRecord>> {
        // Returns of one invoice queue behind the lock on its journal entry.
        journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .filter(reference_filter(
                journal_entries::Column::ReferenceType,
                journal_entries::Column::ReferenceId,
                &SourceRef::new(ReferenceType::Invoice, invoice_id),
            ))
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?;

        sales_returns::Entity::find()
            .filter(sales_returns::Column::TenantId.eq(tenant.into_inner()))
            .filter(sales_returns::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(sales_returns::Column::UpdatedAt)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::sales_return)
            .collect()
    }

    async fn save_sales_return(&mut self, record: &ReturnRecord) -> StoreResult<()> {
        sales_returns::Entity::insert(convert::sales_return_model(record)?)
            .on_conflict(
                OnConflict::columns([
                    sales_returns::Column::TenantId,
                    sales_returns::Column::ReturnId,
                ])
                .update_columns([
                    sales_returns::Column::InvoiceId,
                    sales_returns::Column::Currency,
                    sales_returns::Column::ReturnedSubtotal,
                    sales_returns::Column::Items,
                    sales_returns::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_sales_return(&mut self, tenant: TenantId, return_id: Uuid) -> StoreResult<()> {
        sales_returns::Entity::delete_many()
            .filter(sales_returns::Column::TenantId.eq(tenant.into_inner()))
            .filter(sales_returns::Column::ReturnId.eq(return_id))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn request(
        &mut self,
        tenant: TenantId,
        id: ApprovalRequestId,
    ) -> StoreResult<Option<ApprovalRequest>> {
        approval_requests::Entity::find_by_id(id.into_inner())
            .filter(approval_requests::Column::TenantId.eq(tenant.into_inner()))
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::request)
            .transpose()
    }

    async fn insert_request(&mut self, request: &ApprovalRequest) -> StoreResult<()> {
        approval_requests::Entity::insert(convert::request_model(request)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_request(&mut self, request: &ApprovalRequest) -> StoreResult<()> {
        convert::request_model(request)?
            .update(&self.txn)
            .await
            .map_err(|e| updated(e, "approval request", request.id))?;
        Ok(())
    }

    async fn amount_records(&mut self, tenant: TenantId) -> StoreResult<Vec<AmountRecord>> {
        let base = self.base_currency(tenant).await?;

        let mut records = amount_records::Entity::find()
            .filter(amount_records::Column::TenantId.eq(tenant.into_inner()))
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::document)
            .collect::<StoreResult<Vec<_>>>()?;

        let lines = journal_lines::Entity::find()
            .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
            .filter(journal_entries::Column::TenantId.eq(tenant.into_inner()))
            .filter(journal_entries::Column::IsDeleted.eq(false))
            .order_by_asc(journal_lines::Column::EntryId)
            .order_by_asc(journal_lines::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        for row in lines {
            let line = convert::line(row)?;
            records.push(AmountRecord {
                key: RecordKey::new(RecordKind::JournalLine, line.id.into_inner()),
                tenant_id: tenant,
                original: Money::new(line.amount(), base),
                display: line.display,
            });
        }

        let openings = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant.into_inner()))
            .filter(accounts::Column::OpeningBalance.ne(Decimal::ZERO))
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        for row in openings {
            let account = convert::account(row)?;
            records.push(AmountRecord {
                key: RecordKey::new(RecordKind::OpeningBalance, account.id.into_inner()),
                tenant_id: tenant,
                original: Money::new(account.opening_balance, base),
                display: account.opening_balance_display,
            });
        }

        Ok(records)
    }

    async fn set_display(
        &mut self,
        tenant: TenantId,
        key: &RecordKey,
        display: Option<&DisplayAmount>,
    ) -> StoreResult<()> {
        let (currency, amount, rate) = display_columns(display);
        let affected = match key.kind {
            RecordKind::JournalLine => {
                if self.live_line(tenant, key.id).await?.is_none() {
                    return Err(StoreError::NotFound(format!("journal line {}", key.id)));
                }
                journal_lines::Entity::update_many()
                    .col_expr(journal_lines::Column::DisplayCurrency, Expr::value(currency))
                    .col_expr(journal_lines::Column::DisplayAmount, Expr::value(amount))
                    .col_expr(journal_lines::Column::DisplayRate, Expr::value(rate))
                    .filter(journal_lines::Column::Id.eq(key.id))
                    .exec(&self.txn)
                    .await
            }
            RecordKind::OpeningBalance => {
                accounts::Entity::update_many()
                    .col_expr(accounts::Column::OpeningDisplayCurrency, Expr::value(currency))
                    .col_expr(accounts::Column::OpeningDisplayAmount, Expr::value(amount))
                    .col_expr(accounts::Column::OpeningDisplayRate, Expr::value(rate))
                    .filter(accounts::Column::Id.eq(key.id))
                    .filter(accounts::Column::TenantId.eq(tenant.into_inner()))
                    .exec(&self.txn)
                    .await
            }
            _ => {
                amount_records::Entity::update_many()
                    .col_expr(amount_records::Column::DisplayCurrency, Expr::value(currency))
                    .col_expr(amount_records::Column::DisplayAmount, Expr::value(amount))
                    .col_expr(amount_records::Column::DisplayRate, Expr::value(rate))
                    .filter(amount_records::Column::Kind.eq(key.kind.as_str()))
                    .filter(amount_records::Column::Id.eq(key.id))
                    .filter(amount_records::Column::TenantId.eq(tenant.into_inner()))
                    .exec(&self.txn)
                    .await
            }
        }
        .map_err(db_err)?;

        if affected.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("{} {}", key.kind.as_str(), key.id)));
        }
        Ok(())
    }

    async fn link_source_document(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
        entry: JournalEntryId,
    ) -> StoreResult<()> {
        let link = source_document_links::ActiveModel {
            tenant_id: Set(tenant.into_inner()),
            reference_type: Set(reference.reference_type.as_str().to_string()),
            // manual journals share the nil document id
            reference_id: Set(reference.reference_id.unwrap_or_else(Uuid::nil)),
            entry_id: Set(entry.into_inner()),
            linked_at: Set(convert::timestamp(Utc::now())),
        };
        source_document_links::Entity::insert(link)
            .on_conflict(
                OnConflict::columns([
                    source_document_links::Column::TenantId,
                    source_document_links::Column::ReferenceType,
                    source_document_links::Column::ReferenceId,
                ])
                .update_columns([
                    source_document_links::Column::EntryId,
                    source_document_links::Column::LinkedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn enqueue_outbox(&mut self, event: &OutboxEvent) -> StoreResult<()> {
        audit_outbox::Entity::insert(convert::outbox_model(event))
            .exec_without_returning(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn pending_outbox(&mut self, limit: usize) -> StoreResult<Vec<OutboxEvent>> {
        audit_outbox::Entity::find()
            .filter(audit_outbox::Column::DeliveredAt.is_null())
            .order_by_asc(audit_outbox::Column::CreatedAt)
            .order_by_asc(audit_outbox::Column::Id)
            .limit(u64::try_from(limit).unwrap_or(u64::MAX))
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::outbox_event)
            .collect()
    }

    async fn mark_delivered(
        &mut self,
        ids: &[OutboxEventId],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        audit_outbox::Entity::update_many()
            .col_expr(audit_outbox::Column::DeliveredAt, Expr::value(convert::timestamp(at)))
            .filter(audit_outbox::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(db_err)
    }
}
