//! Storage traits.
//!
//! Every mutating engine operation runs inside one [`LedgerTx`] obtained from
//! [`LedgerStore::begin`]. Dropping a transaction without committing it
//! discards its effects.

mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, ApprovalRequestId, Currency, JournalEntryId, LotId, OutboxEventId, PeriodId,
    ProductId, TenantId,
};
use uuid::Uuid;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryState, MemoryStore};

use crate::audit::OutboxEvent;
use crate::currency::ExchangeRate;
use crate::fiscal::{AccountingPeriod, PeriodStatus};
use crate::inventory::{CostLot, LotConsumption};
use crate::ledger::{
    Account, AccountSubtype, DisplayAmount, JournalEntry, JournalLine, SourceRef, TenantProfile,
};
use crate::posting::ReturnRecord;
use crate::restatement::{AmountRecord, RecordKey};
use crate::workflow::ApprovalRequest;

/// A storage backend able to open transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Transaction type.
    type Tx: LedgerTx;

    /// Opens a transaction.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// One storage transaction.
///
/// Reads observe the transaction's own writes. Tenant-scoped reads never
/// return rows of another tenant.
#[async_trait]
pub trait LedgerTx: Send {
    // ---------- tenants and accounts ----------

    /// Loads a tenant profile.
    async fn tenant(&mut self, tenant: TenantId) -> StoreResult<Option<TenantProfile>>;

    /// All accounts of a tenant.
    async fn accounts(&mut self, tenant: TenantId) -> StoreResult<Vec<Account>>;

    /// Loads an account by id regardless of tenant.
    async fn account(&mut self, id: AccountId) -> StoreResult<Option<Account>>;

    /// The tenant's active account for a posting subtype, lowest code first.
    async fn account_by_subtype(
        &mut self,
        tenant: TenantId,
        subtype: AccountSubtype,
    ) -> StoreResult<Option<Account>>;

    // ---------- periods ----------

    /// All periods of a tenant, ordered by start date.
    async fn periods(&mut self, tenant: TenantId) -> StoreResult<Vec<AccountingPeriod>>;

    /// Inserts a period.
    async fn insert_period(&mut self, period: &AccountingPeriod) -> StoreResult<()>;

    /// Changes a period's status.
    async fn update_period_status(
        &mut self,
        period: PeriodId,
        status: PeriodStatus,
    ) -> StoreResult<()>;

    // ---------- journal ----------

    /// Loads an entry of a tenant, deleted entries included.
    async fn entry(
        &mut self,
        tenant: TenantId,
        id: JournalEntryId,
    ) -> StoreResult<Option<JournalEntry>>;

    /// The live (non-deleted) entry posted from `reference`.
    async fn entry_by_reference(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
    ) -> StoreResult<Option<JournalEntry>>;

    /// All non-deleted entries of a tenant.
    async fn entries(&mut self, tenant: TenantId) -> StoreResult<Vec<JournalEntry>>;

    /// Lines of an entry in insertion order.
    async fn lines(&mut self, entry: JournalEntryId) -> StoreResult<Vec<JournalLine>>;

    /// Inserts an entry with its lines.
    ///
    /// Fails with `Conflict` if a live entry already holds the same document
    /// reference.
    async fn insert_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> StoreResult<()>;

    /// Updates an entry header.
    async fn update_entry(&mut self, entry: &JournalEntry) -> StoreResult<()>;

    /// Replaces all lines of an entry.
    async fn replace_lines(
        &mut self,
        entry: JournalEntryId,
        lines: &[JournalLine],
    ) -> StoreResult<()>;

    // ---------- exchange rates ----------

    /// Rates `from -> to` effective on or before `on_or_before`, tenant and
    /// global rows.
    async fn rates(
        &mut self,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        on_or_before: NaiveDate,
    ) -> StoreResult<Vec<ExchangeRate>>;

    /// Inserts a rate.
    async fn insert_rate(&mut self, rate: &ExchangeRate) -> StoreResult<()>;

    // ---------- FIFO lots ----------

    /// All lots of a product, locked for the rest of the transaction.
    async fn lots_for_update(
        &mut self,
        tenant: TenantId,
        product: ProductId,
    ) -> StoreResult<Vec<CostLot>>;

    /// Inserts a lot.
    async fn insert_lot(&mut self, lot: &CostLot) -> StoreResult<()>;

    /// Writes back quantities of existing lots.
    async fn update_lots(&mut self, lots: &[CostLot]) -> StoreResult<()>;

    /// Consumption records tagged with `source`.
    async fn consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<LotConsumption>>;

    /// Appends consumption records.
    async fn insert_consumptions(&mut self, records: &[LotConsumption]) -> StoreResult<()>;

    /// Removes the consumption records tagged with `source`.
    async fn delete_consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<()>;

    /// Lots created by `source`, locked for the rest of the transaction.
    async fn lots_by_source(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<CostLot>>;

    /// Deletes lots nothing was drawn from.
    async fn delete_lots(&mut self, tenant: TenantId, ids: &[LotId]) -> StoreResult<()>;

    // ---------- sales returns ----------

    /// Returns booked against an invoice, locked for the rest of the
    /// transaction.
    async fn sales_returns(
        &mut self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> StoreResult<Vec<ReturnRecord>>;

    /// Inserts or replaces the record of a return.
    async fn save_sales_return(&mut self, record: &ReturnRecord) -> StoreResult<()>;

    /// Forgets the record of a return.
    async fn delete_sales_return(&mut self, tenant: TenantId, return_id: Uuid) -> StoreResult<()>;

    // ---------- approval requests ----------

    /// Loads a request of a tenant.
    async fn request(
        &mut self,
        tenant: TenantId,
        id: ApprovalRequestId,
    ) -> StoreResult<Option<ApprovalRequest>>;

    /// Inserts a request.
    async fn insert_request(&mut self, request: &ApprovalRequest) -> StoreResult<()>;

    /// Updates a request.
    async fn update_request(&mut self, request: &ApprovalRequest) -> StoreResult<()>;

    // ---------- restatement ----------

    /// Every amount-bearing record of a tenant.
    async fn amount_records(&mut self, tenant: TenantId) -> StoreResult<Vec<AmountRecord>>;

    /// Writes or clears the display amount of a record.
    async fn set_display(
        &mut self,
        tenant: TenantId,
        key: &RecordKey,
        display: Option<&DisplayAmount>,
    ) -> StoreResult<()>;

    // ---------- source documents ----------

    /// Records which entry a document was posted as.
    async fn link_source_document(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
        entry: JournalEntryId,
    ) -> StoreResult<()>;

    // ---------- audit outbox ----------

    /// Appends an outbox event.
    async fn enqueue_outbox(&mut self, event: &OutboxEvent) -> StoreResult<()>;

    /// Undelivered events, oldest first.
    async fn pending_outbox(&mut self, limit: usize) -> StoreResult<Vec<OutboxEvent>>;

    /// Marks events as delivered.
    async fn mark_delivered(&mut self, ids: &[OutboxEventId], at: DateTime<Utc>) -> StoreResult<()>;

    // ---------- lifecycle ----------

    /// Makes the transaction's writes visible.
    async fn commit(self) -> StoreResult<()>;

    /// Discards the transaction's writes.
    async fn rollback(self) -> StoreResult<()>;
}
