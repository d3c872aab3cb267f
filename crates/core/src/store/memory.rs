//! In-memory storage backend.
//!
//! Transactions are serialized by an async mutex: `begin` takes the lock and
//! works on a copy of the state, `commit` writes the copy back, and dropping
//! the transaction throws the copy away.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{
    AccountId, ApprovalRequestId, Currency, JournalEntryId, LotId, Money, OutboxEventId, PeriodId,
    ProductId, TenantId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};
use crate::audit::OutboxEvent;
use crate::currency::ExchangeRate;
use crate::fiscal::{AccountingPeriod, PeriodStatus};
use crate::inventory::{CostLot, LotConsumption};
use crate::ledger::{
    Account, AccountSubtype, DisplayAmount, JournalEntry, JournalLine, SourceRef, TenantProfile,
};
use crate::posting::ReturnRecord;
use crate::restatement::{AmountRecord, RecordKey, RecordKind};
use crate::workflow::ApprovalRequest;

/// Everything the in-memory store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    /// Tenant profiles.
    pub tenants: HashMap<TenantId, TenantProfile>,
    /// Chart of accounts, all tenants.
    pub accounts: Vec<Account>,
    /// Accounting periods, all tenants.
    pub periods: Vec<AccountingPeriod>,
    /// Journal entry headers in insertion order.
    pub entries: Vec<JournalEntry>,
    /// Journal lines by entry.
    pub lines: HashMap<JournalEntryId, Vec<JournalLine>>,
    /// Exchange rates.
    pub rates: Vec<ExchangeRate>,
    /// FIFO cost lots.
    pub lots: Vec<CostLot>,
    /// FIFO draw records.
    pub consumptions: Vec<LotConsumption>,
    /// Sales returns by invoice.
    pub returns: Vec<ReturnRecord>,
    /// Approval requests.
    pub requests: Vec<ApprovalRequest>,
    /// Amount-bearing source documents (invoices, bills, payments, prices).
    pub documents: Vec<AmountRecord>,
    /// Posting linkage of source documents.
    pub document_links: HashMap<(TenantId, SourceRef), JournalEntryId>,
    /// Audit outbox.
    pub outbox: Vec<OutboxEvent>,
}

impl MemoryState {
    /// Lines of every live entry of `tenant`.
    pub fn tenant_lines(&self, tenant: TenantId) -> impl Iterator<Item = &JournalLine> {
        self.entries
            .iter()
            .filter(move |e| e.tenant_id == tenant && !e.is_deleted)
            .flat_map(move |e| self.lines.get(&e.id).into_iter().flatten())
    }

    fn base_currency(&self, tenant: TenantId) -> StoreResult<Currency> {
        self.tenants
            .get(&tenant)
            .map(|t| t.base_currency)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant}")))
    }
}

/// In-memory [`LedgerStore`], used by tests and embedded callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Registers a tenant.
    pub async fn add_tenant(&self, profile: TenantProfile) {
        self.state.lock().await.tenants.insert(profile.tenant_id, profile);
    }

    /// Adds an account.
    pub async fn add_account(&self, account: Account) {
        self.state.lock().await.accounts.push(account);
    }

    /// Adds a period without calendar checks.
    pub async fn add_period(&self, period: AccountingPeriod) {
        self.state.lock().await.periods.push(period);
    }

    /// Adds an exchange rate.
    pub async fn add_rate(&self, rate: ExchangeRate) {
        self.state.lock().await.rates.push(rate);
    }

    /// Adds a lot.
    pub async fn add_lot(&self, lot: CostLot) {
        self.state.lock().await.lots.push(lot);
    }

    /// Adds an amount-bearing source document.
    pub async fn add_document(&self, record: AmountRecord) {
        self.state.lock().await.documents.push(record);
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

/// Transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn not_found(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{what} {id}"))
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn tenant(&mut self, tenant: TenantId) -> StoreResult<Option<TenantProfile>> {
        Ok(self.work.tenants.get(&tenant).cloned())
    }

    async fn accounts(&mut self, tenant: TenantId) -> StoreResult<Vec<Account>> {
        Ok(self
            .work
            .accounts
            .iter()
            .filter(|a| a.tenant_id == tenant)
            .cloned()
            .collect())
    }

    async fn account(&mut self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.work.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_subtype(
        &mut self,
        tenant: TenantId,
        subtype: AccountSubtype,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .work
            .accounts
            .iter()
            .filter(|a| a.tenant_id == tenant && a.is_active && a.subtype == Some(subtype))
            .min_by(|a, b| a.code.cmp(&b.code))
            .cloned())
    }

    async fn periods(&mut self, tenant: TenantId) -> StoreResult<Vec<AccountingPeriod>> {
        let mut periods: Vec<_> = self
            .work
            .periods
            .iter()
            .filter(|p| p.tenant_id == tenant)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.start_date);
        Ok(periods)
    }

    async fn insert_period(&mut self, period: &AccountingPeriod) -> StoreResult<()> {
        self.work.periods.push(period.clone());
        Ok(())
    }

    async fn update_period_status(
        &mut self,
        period: PeriodId,
        status: PeriodStatus,
    ) -> StoreResult<()> {
        let row = self
            .work
            .periods
            .iter_mut()
            .find(|p| p.id == period)
            .ok_or_else(|| not_found("period", period))?;
        row.status = status;
        Ok(())
    }

    async fn entry(
        &mut self,
        tenant: TenantId,
        id: JournalEntryId,
    ) -> StoreResult<Option<JournalEntry>> {
        Ok(self
            .work
            .entries
            .iter()
            .find(|e| e.id == id && e.tenant_id == tenant)
            .cloned())
    }

    async fn entry_by_reference(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
    ) -> StoreResult<Option<JournalEntry>> {
        Ok(self
            .work
            .entries
            .iter()
            .find(|e| e.tenant_id == tenant && !e.is_deleted && e.reference == *reference)
            .cloned())
    }

    async fn entries(&mut self, tenant: TenantId) -> StoreResult<Vec<JournalEntry>> {
        Ok(self
            .work
            .entries
            .iter()
            .filter(|e| e.tenant_id == tenant && !e.is_deleted)
            .cloned()
            .collect())
    }

    async fn lines(&mut self, entry: JournalEntryId) -> StoreResult<Vec<JournalLine>> {
        Ok(self.work.lines.get(&entry).cloned().unwrap_or_default())
    }

    async fn insert_entry(
        &mut self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> StoreResult<()> {
        let duplicate = entry.reference.reference_id.is_some()
            && self.work.entries.iter().any(|e| {
                e.tenant_id == entry.tenant_id && !e.is_deleted && e.reference == entry.reference
            });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "entry for {} already exists",
                entry.reference
            )));
        }

        self.work.entries.push(entry.clone());
        self.work.lines.insert(entry.id, lines.to_vec());
        Ok(())
    }

    async fn update_entry(&mut self, entry: &JournalEntry) -> StoreResult<()> {
        let row = self
            .work
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| not_found("entry", entry.id))?;
        *row = entry.clone();
        Ok(())
    }

    async fn replace_lines(
        &mut self,
        entry: JournalEntryId,
        lines: &[JournalLine],
    ) -> StoreResult<()> {
        if !self.work.entries.iter().any(|e| e.id == entry) {
            return Err(not_found("entry", entry));
        }
        self.work.lines.insert(entry, lines.to_vec());
        Ok(())
    }

    async fn rates(
        &mut self,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        on_or_before: NaiveDate,
    ) -> StoreResult<Vec<ExchangeRate>> {
        Ok(self
            .work
            .rates
            .iter()
            .filter(|r| {
                r.from_currency == from
                    && r.to_currency == to
                    && r.effective_date <= on_or_before
                    && r.tenant_id.is_none_or(|t| t == tenant)
            })
            .cloned()
            .collect())
    }

    async fn insert_rate(&mut self, rate: &ExchangeRate) -> StoreResult<()> {
        self.work.rates.push(rate.clone());
        Ok(())
    }

    async fn lots_for_update(
        &mut self,
        tenant: TenantId,
        product: ProductId,
    ) -> StoreResult<Vec<CostLot>> {
        let mut lots: Vec<_> = self
            .work
            .lots
            .iter()
            .filter(|l| l.tenant_id == tenant && l.product_id == product)
            .cloned()
            .collect();
        lots.sort_by_key(CostLot::fifo_key);
        Ok(lots)
    }

    async fn insert_lot(&mut self, lot: &CostLot) -> StoreResult<()> {
        self.work.lots.push(lot.clone());
        Ok(())
    }

    async fn update_lots(&mut self, lots: &[CostLot]) -> StoreResult<()> {
        for lot in lots {
            let row = self
                .work
                .lots
                .iter_mut()
                .find(|l| l.id == lot.id)
                .ok_or_else(|| not_found("lot", lot.id))?;
            *row = lot.clone();
        }
        Ok(())
    }

    async fn consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<LotConsumption>> {
        Ok(self
            .work
            .consumptions
            .iter()
            .filter(|c| c.tenant_id == tenant && c.source == *source)
            .cloned()
            .collect())
    }

    async fn insert_consumptions(&mut self, records: &[LotConsumption]) -> StoreResult<()> {
        self.work.consumptions.extend_from_slice(records);
        Ok(())
    }

    async fn delete_consumptions(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<()> {
        self.work
            .consumptions
            .retain(|c| !(c.tenant_id == tenant && c.source == *source));
        Ok(())
    }

    async fn lots_by_source(
        &mut self,
        tenant: TenantId,
        source: &SourceRef,
    ) -> StoreResult<Vec<CostLot>> {
        Ok(self
            .work
            .lots
            .iter()
            .filter(|l| l.tenant_id == tenant && l.source_ref == Some(*source))
            .cloned()
            .collect())
    }

    async fn delete_lots(&mut self, tenant: TenantId, ids: &[LotId]) -> StoreResult<()> {
        self.work
            .lots
            .retain(|l| !(l.tenant_id == tenant && ids.contains(&l.id)));
        Ok(())
    }

    async fn sales_returns(
        &mut self,
        tenant: TenantId,
        invoice_id: Uuid,
    ) -> StoreResult<Vec<ReturnRecord>> {
        Ok(self
            .work
            .returns
            .iter()
            .filter(|r| r.tenant_id == tenant && r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn save_sales_return(&mut self, record: &ReturnRecord) -> StoreResult<()> {
        let existing = self
            .work
            .returns
            .iter_mut()
            .find(|r| r.tenant_id == record.tenant_id && r.return_id == record.return_id);
        match existing {
            Some(row) => *row = record.clone(),
            None => self.work.returns.push(record.clone()),
        }
        Ok(())
    }

    async fn delete_sales_return(&mut self, tenant: TenantId, return_id: Uuid) -> StoreResult<()> {
        self.work
            .returns
            .retain(|r| !(r.tenant_id == tenant && r.return_id == return_id));
        Ok(())
    }

    async fn request(
        &mut self,
        tenant: TenantId,
        id: ApprovalRequestId,
    ) -> StoreResult<Option<ApprovalRequest>> {
        Ok(self
            .work
            .requests
            .iter()
            .find(|r| r.id == id && r.tenant_id == tenant)
            .cloned())
    }

    async fn insert_request(&mut self, request: &ApprovalRequest) -> StoreResult<()> {
        self.work.requests.push(request.clone());
        Ok(())
    }

    async fn update_request(&mut self, request: &ApprovalRequest) -> StoreResult<()> {
        let row = self
            .work
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| not_found("approval request", request.id))?;
        *row = request.clone();
        Ok(())
    }

    async fn amount_records(&mut self, tenant: TenantId) -> StoreResult<Vec<AmountRecord>> {
        let base = self.work.base_currency(tenant)?;

        let mut records: Vec<AmountRecord> = self
            .work
            .documents
            .iter()
            .filter(|d| d.tenant_id == tenant)
            .cloned()
            .collect();

        records.extend(self.work.tenant_lines(tenant).map(|line| AmountRecord {
            key: RecordKey::new(RecordKind::JournalLine, line.id.into_inner()),
            tenant_id: tenant,
            original: Money::new(line.amount(), base),
            display: line.display,
        }));

        records.extend(
            self.work
                .accounts
                .iter()
                .filter(|a| a.tenant_id == tenant && !a.opening_balance.is_zero())
                .map(|a| AmountRecord {
                    key: RecordKey::new(RecordKind::OpeningBalance, a.id.into_inner()),
                    tenant_id: tenant,
                    original: Money::new(a.opening_balance, base),
                    display: a.opening_balance_display,
                }),
        );

        Ok(records)
    }

    async fn set_display(
        &mut self,
        tenant: TenantId,
        key: &RecordKey,
        display: Option<&DisplayAmount>,
    ) -> StoreResult<()> {
        let display = display.copied();
        match key.kind {
            RecordKind::JournalLine => {
                let live: Vec<JournalEntryId> = self
                    .work
                    .entries
                    .iter()
                    .filter(|e| e.tenant_id == tenant && !e.is_deleted)
                    .map(|e| e.id)
                    .collect();
                let line = self
                    .work
                    .lines
                    .iter_mut()
                    .filter(|(id, _)| live.contains(id))
                    .flat_map(|(_, lines)| lines.iter_mut())
                    .find(|l| l.id.into_inner() == key.id)
                    .ok_or_else(|| not_found("journal line", key.id))?;
                line.display = display;
            }
            RecordKind::OpeningBalance => {
                let account = self
                    .work
                    .accounts
                    .iter_mut()
                    .find(|a| a.tenant_id == tenant && a.id.into_inner() == key.id)
                    .ok_or_else(|| not_found("account", key.id))?;
                account.opening_balance_display = display;
            }
            _ => {
                let document = self
                    .work
                    .documents
                    .iter_mut()
                    .find(|d| d.tenant_id == tenant && d.key == *key)
                    .ok_or_else(|| not_found(key.kind.as_str(), key.id))?;
                document.display = display;
            }
        }
        Ok(())
    }

    async fn link_source_document(
        &mut self,
        tenant: TenantId,
        reference: &SourceRef,
        entry: JournalEntryId,
    ) -> StoreResult<()> {
        self.work.document_links.insert((tenant, *reference), entry);
        Ok(())
    }

    async fn enqueue_outbox(&mut self, event: &OutboxEvent) -> StoreResult<()> {
        self.work.outbox.push(event.clone());
        Ok(())
    }

    async fn pending_outbox(&mut self, limit: usize) -> StoreResult<Vec<OutboxEvent>> {
        Ok(self
            .work
            .outbox
            .iter()
            .filter(|e| e.delivered_at.is_none())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_delivered(
        &mut self,
        ids: &[OutboxEventId],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        for event in self.work.outbox.iter_mut().filter(|e| ids.contains(&e.id)) {
            event.delivered_at = Some(at);
        }
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let Self { mut guard, work } = self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
