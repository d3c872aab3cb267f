//! The posting engine: the single entry point that turns business events and
//! bookkeeping actions into storage writes.
//!
//! Each operation opens one transaction. On success it commits and the
//! pending audit events are relayed to the sink; on failure it rolls back and
//! nothing is left behind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use folio_shared::config::{FolioConfig, LedgerConfig};
use folio_shared::types::{
    AccountId, ApprovalRequestId, Currency, JournalEntryId, PeriodId, ProductId, TenantId,
    round_half_up,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::PostingError;
use super::event::BusinessEvent;
use super::returns::{ReturnRecord, check_return};
use super::templates::{
    AccountSlot, PricedLine, TemplateLine, document_lines, price_lines, return_cost_lines,
    sale_cost_lines,
};
use crate::audit::{AuditAction, AuditSink, OutboxEvent, TracingAuditSink, relay_outbox};
use crate::currency::{ExternalRateSource, RateQuote, RateResolver};
use crate::fiscal::{
    AccountingPeriod, PeriodClassification, PeriodStatus, classify, ensure_postable,
    validate_new_period, validate_transition,
};
use crate::inventory::{
    Consumption, CostLot, InventoryError, InventoryService, LotConsumption, LotSource,
    Reconciliation, weighted_unit_cost,
};
use crate::ledger::{
    AccountSubtype, EntryStatus, EntryType, LedgerError, LedgerService, NewEntry, NewLine,
    ReferenceType, SourceRef, TenantProfile, TrialBalance,
};
use crate::restatement::{RestatementService, RestatementSummary};
use crate::store::{LedgerStore, LedgerTx};
use crate::workflow::{
    Actor, ApprovalEngine, ApprovalRequest, ApprovalTiers, RequestKind, UserRole, WorkflowService,
};

/// Outbox events relayed per operation.
const RELAY_BATCH: usize = 100;

/// Result of posting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOutcome {
    /// Entry representing the event.
    pub entry_id: JournalEntryId,
    /// A new entry was written.
    pub created: bool,
    /// An existing entry got different lines or a new date.
    pub amended: bool,
}

/// Result of a stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// What the count changed in the lots.
    pub reconciliation: Reconciliation,
    /// Adjustment entry, absent when the count matched or had no value.
    pub entry_id: Option<JournalEntryId>,
}

fn authorize(actor: &Actor, allowed: bool, action: &'static str) -> Result<(), PostingError> {
    if allowed {
        Ok(())
    } else {
        Err(PostingError::Forbidden {
            role: actor.role,
            action,
        })
    }
}

fn ensure_tenant(actor: &Actor, tenant: TenantId) -> Result<(), PostingError> {
    if actor.tenant_id == tenant {
        Ok(())
    } else {
        Err(PostingError::TenantMismatch {
            actor_tenant: actor.tenant_id,
            tenant,
        })
    }
}

async fn profile<T: LedgerTx>(tx: &mut T, tenant: TenantId) -> Result<TenantProfile, PostingError> {
    tx.tenant(tenant).await?.ok_or(PostingError::TenantNotFound(tenant))
}

async fn account_for<T: LedgerTx>(
    tx: &mut T,
    tenant: TenantId,
    subtype: AccountSubtype,
) -> Result<AccountId, PostingError> {
    tx.account_by_subtype(tenant, subtype)
        .await?
        .map(|a| a.id)
        .ok_or(PostingError::AccountNotConfigured { subtype })
}

async fn audit<T: LedgerTx>(
    tx: &mut T,
    actor: &Actor,
    action: AuditAction,
    subject: Uuid,
    payload: serde_json::Value,
) -> Result<(), PostingError> {
    let event = OutboxEvent::new(actor.tenant_id, action, subject, Some(actor.user_id), payload);
    tx.enqueue_outbox(&event).await?;
    Ok(())
}

/// Ledger consistency engine over a storage backend.
pub struct PostingEngine<S: LedgerStore> {
    store: S,
    ledger: LedgerService,
    resolver: RateResolver,
    workflow: WorkflowService,
    restatement: RestatementService,
    config: LedgerConfig,
    sink: Arc<dyn AuditSink>,
}

impl<S: LedgerStore> PostingEngine<S> {
    /// Creates an engine without an external rate feed, auditing to tracing.
    #[must_use]
    pub fn new(store: S, config: &FolioConfig) -> Self {
        Self {
            store,
            ledger: LedgerService::from_config(&config.ledger),
            resolver: RateResolver::new(&config.rates),
            workflow: WorkflowService::new(ApprovalTiers::from(&config.approval)),
            restatement: RestatementService::new(config.ledger.clone()),
            config: config.ledger.clone(),
            sink: Arc::new(TracingAuditSink),
        }
    }

    /// Uses `source` as the last rate resolution step.
    #[must_use]
    pub fn with_rate_source(mut self, source: Arc<dyn ExternalRateSource>) -> Self {
        self.resolver = self.resolver.with_source(source);
        self
    }

    /// Relays audit events to `sink`.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The storage backend.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The rate resolver, for cache control.
    #[must_use]
    pub const fn rates(&self) -> &RateResolver {
        &self.resolver
    }

    async fn finish<R>(
        &self,
        tx: S::Tx,
        operation: &'static str,
        result: Result<R, PostingError>,
    ) -> Result<R, PostingError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                self.relay().await;
                Ok(value)
            }
            Err(e) => {
                warn!(
                    operation, code = e.error_code(), error = %e,
                    "Operation rejected, rolling back"
                );
                if let Err(rollback) = tx.rollback().await {
                    warn!(operation, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn relay(&self) {
        match relay_outbox(&self.store, self.sink.as_ref(), RELAY_BATCH).await {
            Ok(0) => {}
            Ok(delivered) => debug!(delivered, "Audit events relayed"),
            Err(e) => warn!(error = %e, "Audit relay failed, events stay pending"),
        }
    }

    // ---------- posting ----------

    /// Posts `event` dated `date` for `tenant`.
    ///
    /// Posting a document again amends its entry in place; an unchanged
    /// repost writes nothing and reports neither `created` nor `amended`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step; storage is left untouched.
    pub async fn post(
        &self,
        event: &BusinessEvent,
        date: NaiveDate,
        tenant: TenantId,
        actor: &Actor,
    ) -> Result<PostingOutcome, PostingError> {
        ensure_tenant(actor, tenant)?;
        authorize(actor, actor.role != UserRole::Viewer, "post events")?;
        event.validate()?;

        let mut tx = self.store.begin().await?;
        let result = self.post_in(&mut tx, actor, event, date).await;
        self.finish(tx, "post", result).await
    }

    async fn post_in(
        &self,
        tx: &mut S::Tx,
        actor: &Actor,
        event: &BusinessEvent,
        date: NaiveDate,
    ) -> Result<PostingOutcome, PostingError> {
        let tenant = actor.tenant_id;
        let base = profile(tx, tenant).await?.base_currency;
        let reference = event.source_ref();

        let existing = tx.entry_by_reference(tenant, &reference).await?;
        let periods = tx.periods(tenant).await?;
        ensure_postable(&periods, date)?;
        if let Some(entry) = &existing {
            if entry.status == EntryStatus::Reversed {
                return Err(LedgerError::AlreadyReversed(entry.id).into());
            }
            ensure_postable(&periods, entry.entry_date)?;
        }

        let currency = event.currency();
        let mut lines = document_lines(
            event,
            self.config.return_tax_policy,
            self.config.decimals_for(currency),
        )?;
        lines.extend(self.move_stock(tx, tenant, event, date, reference).await?);

        let quote = self.resolver.resolve(tx, tenant, currency, base, date).await?;
        let priced = price_lines(
            &lines,
            currency,
            quote.rate,
            currency != base,
            self.config.decimals_for(base),
        );
        let new_lines = Self::bind_accounts(tx, tenant, &priced).await?;

        let (entry_id, created, amended) = match existing {
            Some(entry) => {
                let amended = self.ledger.replace_lines(tx, &entry, date, &new_lines).await?;
                (entry.id, false, amended)
            }
            None => {
                let header = NewEntry {
                    tenant_id: tenant,
                    entry_date: date,
                    reference,
                    description: format!("{} {}", event.event_type(), event.source_id()),
                    status: EntryStatus::Posted,
                };
                (self.ledger.commit_entry(tx, header, new_lines).await?, true, false)
            }
        };
        tx.link_source_document(tenant, &reference, entry_id).await?;

        if created || amended {
            let action = if created {
                AuditAction::EntryPosted
            } else {
                AuditAction::EntryAmended
            };
            audit(
                tx,
                actor,
                action,
                entry_id.into_inner(),
                json!({
                    "reference": reference.to_string(),
                    "entry_date": date,
                    "currency": currency,
                    "rate": quote.rate,
                    "rate_step": quote.step,
                }),
            )
            .await?;
        }

        info!(
            tenant_id = %tenant,
            entry_id = %entry_id,
            reference_type = %reference.reference_type,
            created,
            amended,
            "Event posted"
        );
        Ok(PostingOutcome {
            entry_id,
            created,
            amended,
        })
    }

    /// Applies the stock movement of a sale or return and returns its cost lines.
    async fn move_stock(
        &self,
        tx: &mut S::Tx,
        tenant: TenantId,
        event: &BusinessEvent,
        date: NaiveDate,
        reference: SourceRef,
    ) -> Result<Vec<TemplateLine>, PostingError> {
        let mut lines = Vec::new();
        match event {
            BusinessEvent::Invoice { items, .. } => {
                InventoryService::release(tx, tenant, &reference).await?;
                for item in items {
                    let drawn = InventoryService::consume(
                        tx,
                        tenant,
                        item.product_id,
                        item.quantity,
                        reference,
                    )
                    .await?;
                    lines.extend(sale_cost_lines(drawn.total_cost));
                }
            }
            BusinessEvent::SalesReturn {
                id,
                invoice_id,
                currency,
                returned_subtotal,
                invoice_subtotal,
                items,
                ..
            } => {
                let record = ReturnRecord {
                    tenant_id: tenant,
                    return_id: *id,
                    invoice_id: *invoice_id,
                    currency: *currency,
                    returned_subtotal: *returned_subtotal,
                    items: items.clone(),
                };
                let earlier: Vec<ReturnRecord> = tx
                    .sales_returns(tenant, *invoice_id)
                    .await?
                    .into_iter()
                    .filter(|r| r.return_id != *id)
                    .collect();
                let invoice = SourceRef::new(ReferenceType::Invoice, *invoice_id);
                let sold = tx.consumptions(tenant, &invoice).await?;
                check_return(&record, *invoice_subtotal, &sold, &earlier)?;

                for item in items {
                    let drawn: Vec<LotConsumption> = sold
                        .iter()
                        .filter(|c| c.product_id == item.product_id)
                        .cloned()
                        .collect();
                    let unit_cost = weighted_unit_cost(&drawn)
                        .ok_or(InventoryError::NoCostBasis(item.product_id))?;
                    InventoryService::restock_return(
                        tx,
                        tenant,
                        item.product_id,
                        item.quantity,
                        unit_cost,
                        date,
                        reference,
                    )
                    .await?;
                    lines.extend(return_cost_lines(item.quantity * unit_cost));
                }
                tx.save_sales_return(&record).await?;
            }
            _ => {}
        }
        Ok(lines)
    }

    async fn bind_accounts(
        tx: &mut S::Tx,
        tenant: TenantId,
        priced: &[PricedLine],
    ) -> Result<Vec<NewLine>, PostingError> {
        let mut chart: HashMap<AccountSubtype, AccountId> = HashMap::new();
        let mut lines = Vec::with_capacity(priced.len());

        for line in priced {
            let account_id = match line.slot {
                AccountSlot::Explicit(id) => id,
                AccountSlot::Subtype(subtype) => match chart.get(&subtype) {
                    Some(id) => *id,
                    None => {
                        let id = account_for(tx, tenant, subtype).await?;
                        chart.insert(subtype, id);
                        id
                    }
                },
            };
            let new_line = match line.side {
                EntryType::Debit => NewLine::debit(account_id, line.amount),
                EntryType::Credit => NewLine::credit(account_id, line.amount),
            }
            .with_description(line.description);
            lines.push(match line.original {
                Some(original) => new_line.with_original(original),
                None => new_line,
            });
        }
        Ok(lines)
    }

    /// Offsets a posted entry with a mirror entry dated `date`.
    ///
    /// Stock moved by the document goes back: a sale's draw returns to its
    /// lots and a return's lots are deleted.
    ///
    /// # Errors
    ///
    /// See [`LedgerService::reverse_entry`]. Also returns `ReturnsOutstanding`
    /// for an invoice with a live return and `LotAlreadyDrawn` when returned
    /// goods have been sold again.
    pub async fn reverse(
        &self,
        actor: &Actor,
        entry_id: JournalEntryId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<JournalEntryId, PostingError> {
        authorize(actor, actor.role.can_keep_books(), "reverse entries")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let reversed = LedgerService::load_entry(&mut tx, actor.tenant_id, entry_id).await?;
            let reversal = self
                .ledger
                .reverse_entry(&mut tx, actor.tenant_id, entry_id, date, reason)
                .await?;
            Self::unwind_stock(&mut tx, actor.tenant_id, &reversed.reference).await?;
            audit(
                &mut tx,
                actor,
                AuditAction::EntryReversed,
                entry_id.into_inner(),
                json!({ "reversal_id": reversal, "date": date, "reason": reason }),
            )
            .await?;
            Ok::<_, PostingError>(reversal)
        }
        .await;
        self.finish(tx, "reverse", result).await
    }

    /// Undoes the stock movement of a document whose entry is reversed.
    async fn unwind_stock(
        tx: &mut S::Tx,
        tenant: TenantId,
        reference: &SourceRef,
    ) -> Result<(), PostingError> {
        let Some(document) = reference.reference_id else {
            return Ok(());
        };
        match reference.reference_type {
            ReferenceType::Invoice => {
                if let Some(open) = tx.sales_returns(tenant, document).await?.first() {
                    return Err(PostingError::ReturnsOutstanding {
                        invoice_id: document,
                        return_id: open.return_id,
                    });
                }
            }
            ReferenceType::SalesReturn => tx.delete_sales_return(tenant, document).await?,
            _ => {}
        }
        InventoryService::unwind(tx, tenant, reference).await?;
        Ok(())
    }

    /// Per-account totals in the tenant's base currency.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` or a storage error.
    pub async fn trial_balance(&self, tenant: TenantId) -> Result<TrialBalance, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let base = profile(&mut tx, tenant).await?.base_currency;
            Ok::<_, PostingError>(self.ledger.trial_balance(&mut tx, tenant, base).await?)
        }
        .await;
        tx.rollback().await?;
        result
    }

    // ---------- periods ----------

    /// Classifies `date` against the tenant's calendar.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn classify(
        &self,
        tenant: TenantId,
        date: NaiveDate,
    ) -> Result<PeriodClassification, PostingError> {
        let mut tx = self.store.begin().await?;
        let periods = tx.periods(tenant).await;
        tx.rollback().await?;
        Ok(classify(&periods?, date))
    }

    /// Adds an open period to the tenant's calendar.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or a calendar rule violation.
    pub async fn define_period(
        &self,
        actor: &Actor,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AccountingPeriod, PostingError> {
        authorize(actor, actor.role.can_keep_books(), "define periods")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let existing = tx.periods(actor.tenant_id).await?;
            validate_new_period(&existing, start, end)?;

            let period = AccountingPeriod::new(actor.tenant_id, name, start, end);
            tx.insert_period(&period).await?;
            audit(
                &mut tx,
                actor,
                AuditAction::PeriodDefined,
                period.id.into_inner(),
                json!({ "name": name, "start": start, "end": end }),
            )
            .await?;

            info!(
                tenant_id = %actor.tenant_id, period_id = %period.id, %start, %end,
                "Period defined"
            );
            Ok::<_, PostingError>(period)
        }
        .await;
        self.finish(tx, "define_period", result).await
    }

    /// Closes an open period.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or a transition rule violation.
    pub async fn close_period(&self, actor: &Actor, period: PeriodId) -> Result<(), PostingError> {
        authorize(actor, actor.role.can_keep_books(), "close periods")?;
        self.transition(actor, period, PeriodStatus::Closed, AuditAction::PeriodClosed)
            .await
    }

    /// Locks a closed period for good. Elevated roles only.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or a transition rule violation.
    pub async fn lock_period(&self, actor: &Actor, period: PeriodId) -> Result<(), PostingError> {
        authorize(actor, actor.role.is_elevated(), "lock periods")?;
        self.transition(actor, period, PeriodStatus::Locked, AuditAction::PeriodLocked)
            .await
    }

    async fn transition(
        &self,
        actor: &Actor,
        period: PeriodId,
        to: PeriodStatus,
        action: AuditAction,
    ) -> Result<(), PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let periods = tx.periods(actor.tenant_id).await?;
            validate_transition(&periods, period, to)?;
            tx.update_period_status(period, to).await?;
            audit(&mut tx, actor, action, period.into_inner(), json!({ "status": to })).await?;

            info!(
                tenant_id = %actor.tenant_id, period_id = %period, status = %to,
                "Period status changed"
            );
            Ok::<_, PostingError>(())
        }
        .await;
        self.finish(tx, "period_transition", result).await
    }

    // ---------- inventory ----------

    /// Receives stock as a new cost lot.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::receive`].
    pub async fn receive(
        &self,
        actor: &Actor,
        product: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
        date: NaiveDate,
        source: LotSource,
    ) -> Result<CostLot, PostingError> {
        authorize(actor, actor.role != UserRole::Viewer, "receive stock")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let lot = InventoryService::receive(
                &mut tx,
                actor.tenant_id,
                product,
                quantity,
                unit_cost,
                date,
                source,
                None,
            )
            .await?;
            audit(
                &mut tx,
                actor,
                AuditAction::LotReceived,
                lot.id.into_inner(),
                json!({
                    "product_id": product,
                    "quantity": quantity,
                    "unit_cost": unit_cost,
                    "source": source.as_str(),
                }),
            )
            .await?;
            Ok::<_, PostingError>(lot)
        }
        .await;
        self.finish(tx, "receive", result).await
    }

    /// Draws stock oldest lot first, recording the draw against `source`.
    ///
    /// # Errors
    ///
    /// See [`InventoryService::consume`].
    pub async fn consume(
        &self,
        actor: &Actor,
        product: ProductId,
        quantity: Decimal,
        source: SourceRef,
    ) -> Result<Consumption, PostingError> {
        authorize(actor, actor.role != UserRole::Viewer, "consume stock")?;
        let mut tx = self.store.begin().await?;
        let result = InventoryService::consume(&mut tx, actor.tenant_id, product, quantity, source)
            .await
            .map_err(PostingError::from);
        self.finish(tx, "consume", result).await
    }

    /// Brings a product's lots in line with a stock count and books the
    /// valued difference against inventory adjustment.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, a period error for `date`, an inventory error or
    /// `AccountNotConfigured`.
    pub async fn reconcile_inventory(
        &self,
        actor: &Actor,
        product: ProductId,
        on_hand: Decimal,
        date: NaiveDate,
    ) -> Result<ReconcileOutcome, PostingError> {
        authorize(actor, actor.role.can_keep_books(), "reconcile inventory")?;
        let mut tx = self.store.begin().await?;
        let result = self.reconcile_in(&mut tx, actor, product, on_hand, date).await;
        self.finish(tx, "reconcile_inventory", result).await
    }

    async fn reconcile_in(
        &self,
        tx: &mut S::Tx,
        actor: &Actor,
        product: ProductId,
        on_hand: Decimal,
        date: NaiveDate,
    ) -> Result<ReconcileOutcome, PostingError> {
        let tenant = actor.tenant_id;
        let base = profile(tx, tenant).await?.base_currency;
        ensure_postable(&tx.periods(tenant).await?, date)?;

        let reference = SourceRef::new(ReferenceType::InventoryReconciliation, Uuid::now_v7());
        let reconciliation =
            InventoryService::reconcile(tx, tenant, product, on_hand, date, reference).await?;
        let value = round_half_up(reconciliation.value(), self.config.decimals_for(base));

        let entry_id = if value.is_zero() {
            None
        } else {
            let (debit, credit) = if value.is_sign_positive() {
                (AccountSubtype::Inventory, AccountSubtype::InventoryAdjustment)
            } else {
                (AccountSubtype::InventoryAdjustment, AccountSubtype::Inventory)
            };
            let amount = value.abs();
            let lines = vec![
                NewLine::debit(account_for(tx, tenant, debit).await?, amount)
                    .with_description("Stock count adjustment"),
                NewLine::credit(account_for(tx, tenant, credit).await?, amount)
                    .with_description("Stock count adjustment"),
            ];
            let header = NewEntry {
                tenant_id: tenant,
                entry_date: date,
                reference,
                description: format!("Stock count of product {product}"),
                status: EntryStatus::Posted,
            };
            Some(self.ledger.commit_entry(tx, header, lines).await?)
        };

        audit(
            tx,
            actor,
            AuditAction::InventoryReconciled,
            product.into_inner(),
            json!({
                "book_quantity": reconciliation.book_quantity,
                "counted_quantity": on_hand,
                "value": value,
                "entry_id": entry_id,
            }),
        )
        .await?;

        Ok(ReconcileOutcome {
            reconciliation,
            entry_id,
        })
    }

    // ---------- currency ----------

    /// Resolves the rate `from -> to` for `date`, persisting a rate fetched
    /// from the external feed.
    ///
    /// # Errors
    ///
    /// Returns `RateNotFound` or a storage error.
    pub async fn resolve_rate(
        &self,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        date: NaiveDate,
    ) -> Result<RateQuote, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self
            .resolver
            .resolve(&mut tx, tenant, from, to, date)
            .await
            .map_err(PostingError::from);
        self.finish(tx, "resolve_rate", result).await
    }

    /// Writes display amounts in `target` for every amount record.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `InvalidRate` or a storage error.
    pub async fn restate(
        &self,
        actor: &Actor,
        target: Currency,
        rate: Decimal,
    ) -> Result<RestatementSummary, PostingError> {
        authorize(actor, actor.role.can_keep_books(), "restate amounts")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let summary = self.restatement.restate(&mut tx, actor.tenant_id, target, rate).await?;
            audit(
                &mut tx,
                actor,
                AuditAction::Restated,
                actor.tenant_id.into_inner(),
                json!({ "currency": target, "rate": rate, "records": summary.total() }),
            )
            .await?;
            Ok::<_, PostingError>(summary)
        }
        .await;
        self.finish(tx, "restate", result).await
    }

    /// Clears every display amount.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or a storage error.
    pub async fn reset_restatement(
        &self,
        actor: &Actor,
    ) -> Result<RestatementSummary, PostingError> {
        authorize(actor, actor.role.can_keep_books(), "reset restatement")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let summary = self.restatement.reset(&mut tx, actor.tenant_id).await?;
            audit(
                &mut tx,
                actor,
                AuditAction::RestatementReset,
                actor.tenant_id.into_inner(),
                json!({ "records": summary.total() }),
            )
            .await?;
            Ok::<_, PostingError>(summary)
        }
        .await;
        self.finish(tx, "reset_restatement", result).await
    }

    // ---------- approvals ----------

    /// Opens a refund or dividend request.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden`, `InvalidAmount` or a storage error.
    pub async fn create_request(
        &self,
        actor: &Actor,
        kind: RequestKind,
        amount: Decimal,
        currency: Currency,
        source_document: Option<SourceRef>,
    ) -> Result<ApprovalRequest, PostingError> {
        authorize(actor, actor.role != UserRole::Viewer, "create requests")?;
        let mut tx = self.store.begin().await?;
        let result = async {
            let request = self
                .workflow
                .create_request(&mut tx, actor, kind, amount, currency, source_document)
                .await?;
            audit(
                &mut tx,
                actor,
                AuditAction::RequestCreated,
                request.id.into_inner(),
                json!({
                    "kind": kind,
                    "amount": amount,
                    "currency": currency,
                    "stages": request.required_approvers,
                }),
            )
            .await?;
            Ok::<_, PostingError>(request)
        }
        .await;
        self.finish(tx, "create_request", result).await
    }

    /// Signs the next approval stage.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::approve`].
    pub async fn approve(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let request = self.workflow.approve(&mut tx, actor, id).await?;
            audit(
                &mut tx,
                actor,
                AuditAction::RequestApproved,
                id.into_inner(),
                json!({ "role": actor.role, "status": request.status }),
            )
            .await?;
            Ok::<_, PostingError>(request)
        }
        .await;
        self.finish(tx, "approve", result).await
    }

    /// Rejects a request.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::reject`].
    pub async fn reject(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
        reason: &str,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let request = self.workflow.reject(&mut tx, actor, id, reason).await?;
            let details = json!({ "reason": reason });
            audit(&mut tx, actor, AuditAction::RequestRejected, id.into_inner(), details).await?;
            Ok::<_, PostingError>(request)
        }
        .await;
        self.finish(tx, "reject", result).await
    }

    /// Cancels a request.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::cancel`].
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let request = self.workflow.cancel(&mut tx, actor, id).await?;
            audit(&mut tx, actor, AuditAction::RequestCancelled, id.into_inner(), json!({})).await?;
            Ok::<_, PostingError>(request)
        }
        .await;
        self.finish(tx, "cancel", result).await
    }

    /// Sends an approved, undisbursed request back to `Pending`.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::reopen`].
    pub async fn reopen(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let request = self.workflow.reopen(&mut tx, actor, id).await?;
            audit(&mut tx, actor, AuditAction::RequestReopened, id.into_inner(), json!({})).await?;
            Ok::<_, PostingError>(request)
        }
        .await;
        self.finish(tx, "reopen", result).await
    }

    /// Pays out an approved request.
    ///
    /// The voucher entry, the `Disbursed` state and the audit record commit
    /// together. The voucher's document id is the request id, so a request
    /// maps to at most one live voucher.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized`, `NotApproved`, `DuplicateDisbursement`, or any
    /// posting error for the voucher.
    pub async fn disburse(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
        date: NaiveDate,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut tx = self.store.begin().await?;
        let result = self.disburse_in(&mut tx, actor, id, date).await;
        self.finish(tx, "disburse", result).await
    }

    async fn disburse_in(
        &self,
        tx: &mut S::Tx,
        actor: &Actor,
        id: ApprovalRequestId,
        date: NaiveDate,
    ) -> Result<ApprovalRequest, PostingError> {
        let mut request = WorkflowService::load(tx, actor, id).await?;
        ApprovalEngine::check_disbursement(&request, actor)?;

        let event = match request.kind {
            RequestKind::Refund => BusinessEvent::RefundDisbursement {
                id: id.into_inner(),
                currency: request.currency,
                amount: request.amount,
            },
            RequestKind::Dividend => BusinessEvent::DividendDistribution {
                id: id.into_inner(),
                currency: request.currency,
                amount: request.amount,
            },
        };
        event.validate()?;
        let voucher = self.post_in(tx, actor, &event, date).await?;

        ApprovalEngine::mark_disbursed(&mut request, voucher.entry_id, Utc::now());
        tx.update_request(&request).await?;
        audit(
            tx,
            actor,
            AuditAction::RequestDisbursed,
            id.into_inner(),
            json!({ "voucher": voucher.entry_id, "date": date }),
        )
        .await?;

        info!(
            tenant_id = %actor.tenant_id, request_id = %id, voucher = %voucher.entry_id,
            "Request disbursed"
        );
        Ok(request)
    }
}
