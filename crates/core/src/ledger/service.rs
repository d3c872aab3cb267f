//! Ledger store rules: the only path by which journal entries are written.
//!
//! Every write validates line shapes, balance, accounts and the period of
//! the entry date before touching storage.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use folio_shared::config::LedgerConfig;
use folio_shared::types::{AccountId, Currency, JournalEntryId, JournalLineId, TenantId};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::account::Account;
use super::balance::TrialBalance;
use super::entry::{
    EntryStatus, JournalEntry, JournalLine, NewEntry, NewLine, ReferenceType, SourceRef,
};
use super::error::LedgerError;
use super::reversal::reversing_lines;
use super::validation::{EntryTotals, validate_accounts, validate_lines};
use crate::fiscal::ensure_postable;
use crate::store::LedgerTx;

/// Turns submitted lines into stored lines for `entry_id`.
///
/// Line ids are reused position by position from `existing`, and a line equal
/// to its predecessor keeps its display amount, so resubmitting unchanged
/// lines yields identical rows.
#[must_use]
pub fn materialize_lines(
    entry_id: JournalEntryId,
    lines: &[NewLine],
    existing: &[JournalLine],
) -> Vec<JournalLine> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let previous = existing.get(i);
            let unchanged = previous.is_some_and(|p| p.to_new_line() == *line);
            JournalLine {
                id: previous.map_or_else(JournalLineId::new, |p| p.id),
                entry_id,
                account_id: line.account_id,
                debit: line.debit,
                credit: line.credit,
                original: line.original,
                display: if unchanged { previous.and_then(|p| p.display) } else { None },
                description: line.description.clone(),
            }
        })
        .collect()
}

/// Journal write rules with a configured balance tolerance.
#[derive(Debug, Clone, Copy)]
pub struct LedgerService {
    tolerance: Decimal,
}

impl LedgerService {
    /// Creates a service accepting imbalances up to `tolerance`.
    #[must_use]
    pub const fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    /// Creates a service from configuration.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.balance_tolerance)
    }

    /// Largest accepted debit/credit difference.
    #[must_use]
    pub const fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Runs every write check for lines dated `date`.
    ///
    /// # Errors
    ///
    /// Returns the first rule violated.
    pub async fn check<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        date: NaiveDate,
        lines: &[NewLine],
    ) -> Result<EntryTotals, LedgerError> {
        let totals = validate_lines(lines, self.tolerance)?;

        let mut accounts: HashMap<AccountId, Account> = HashMap::new();
        for line in lines {
            if accounts.contains_key(&line.account_id) {
                continue;
            }
            if let Some(account) = tx.account(line.account_id).await? {
                accounts.insert(account.id, account);
            }
        }
        validate_accounts(tenant, lines, &accounts)?;

        let periods = tx.periods(tenant).await?;
        ensure_postable(&periods, date)?;

        Ok(totals)
    }

    /// Validates and stores a new entry.
    ///
    /// # Errors
    ///
    /// Returns a validation, period or storage error. A concurrent entry for the
    /// same document surfaces as a retryable `Store(Conflict)`.
    pub async fn commit_entry<T: LedgerTx>(
        &self,
        tx: &mut T,
        entry: NewEntry,
        lines: Vec<NewLine>,
    ) -> Result<JournalEntryId, LedgerError> {
        self.insert(tx, entry, &lines, None).await
    }

    async fn insert<T: LedgerTx>(
        &self,
        tx: &mut T,
        entry: NewEntry,
        lines: &[NewLine],
        reversal_of: Option<JournalEntryId>,
    ) -> Result<JournalEntryId, LedgerError> {
        let totals = self.check(tx, entry.tenant_id, entry.entry_date, lines).await?;

        let now = Utc::now();
        let header = JournalEntry {
            id: JournalEntryId::new(),
            tenant_id: entry.tenant_id,
            entry_date: entry.entry_date,
            reference: entry.reference,
            description: entry.description,
            status: entry.status,
            is_deleted: false,
            reversal_of,
            created_at: now,
            updated_at: now,
        };
        let stored = materialize_lines(header.id, lines, &[]);
        tx.insert_entry(&header, &stored).await?;

        info!(
            entry_id = %header.id,
            tenant_id = %header.tenant_id,
            reference_type = %header.reference.reference_type,
            total = %totals.debit,
            "Journal entry committed"
        );
        Ok(header.id)
    }

    /// Overwrites the lines of `entry`, re-dated to `date`.
    ///
    /// Returns false, writing nothing, when lines and date are unchanged.
    ///
    /// # Errors
    ///
    /// Returns a validation, period or storage error. Both the old and the new
    /// date must be postable.
    pub async fn replace_lines<T: LedgerTx>(
        &self,
        tx: &mut T,
        entry: &JournalEntry,
        date: NaiveDate,
        lines: &[NewLine],
    ) -> Result<bool, LedgerError> {
        let existing = tx.lines(entry.id).await?;
        let unchanged = entry.entry_date == date
            && existing.len() == lines.len()
            && existing.iter().zip(lines).all(|(old, new)| old.to_new_line() == *new);
        if unchanged {
            debug!(entry_id = %entry.id, "Lines unchanged, nothing to write");
            return Ok(false);
        }

        if entry.entry_date != date {
            ensure_postable(&tx.periods(entry.tenant_id).await?, entry.entry_date)?;
        }
        self.check(tx, entry.tenant_id, date, lines).await?;

        let stored = materialize_lines(entry.id, lines, &existing);
        tx.replace_lines(entry.id, &stored).await?;

        let mut header = entry.clone();
        header.entry_date = date;
        header.updated_at = Utc::now();
        tx.update_entry(&header).await?;

        info!(
            entry_id = %entry.id, tenant_id = %entry.tenant_id, lines = lines.len(),
            "Journal lines replaced"
        );
        Ok(true)
    }

    /// Loads a live entry of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` for missing and soft-deleted entries.
    pub async fn load_entry<T: LedgerTx>(
        tx: &mut T,
        tenant: TenantId,
        id: JournalEntryId,
    ) -> Result<JournalEntry, LedgerError> {
        tx.entry(tenant, id)
            .await?
            .filter(|e| !e.is_deleted)
            .ok_or(LedgerError::EntryNotFound(id))
    }

    /// Corrects the lines of an existing entry in place.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyReversed`, or any write-check error.
    pub async fn correct_entry<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        id: JournalEntryId,
        lines: &[NewLine],
    ) -> Result<bool, LedgerError> {
        let entry = Self::load_entry(tx, tenant, id).await?;
        if entry.status == EntryStatus::Reversed {
            return Err(LedgerError::AlreadyReversed(id));
        }
        self.replace_lines(tx, &entry, entry.entry_date, lines).await
    }

    /// Offsets a posted entry with a mirror entry dated `date`.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyReversed`, `NotPosted`, or any
    /// write-check error for the reversal.
    pub async fn reverse_entry<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        id: JournalEntryId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<JournalEntryId, LedgerError> {
        let mut original = Self::load_entry(tx, tenant, id).await?;
        match original.status {
            EntryStatus::Reversed => return Err(LedgerError::AlreadyReversed(id)),
            EntryStatus::Draft => return Err(LedgerError::NotPosted(id)),
            EntryStatus::Posted => {}
        }

        let lines: Vec<NewLine> =
            tx.lines(id).await?.iter().map(JournalLine::to_new_line).collect();
        let reversal = NewEntry {
            tenant_id: tenant,
            entry_date: date,
            reference: SourceRef::new(ReferenceType::Reversal, id.into_inner()),
            description: format!("Reversal of {id}: {reason}"),
            status: EntryStatus::Posted,
        };
        let reversal_id = self.insert(tx, reversal, &reversing_lines(&lines), Some(id)).await?;

        original.status = EntryStatus::Reversed;
        original.updated_at = Utc::now();
        tx.update_entry(&original).await?;

        info!(
            entry_id = %id, reversal_id = %reversal_id, tenant_id = %tenant,
            "Journal entry reversed"
        );
        Ok(reversal_id)
    }

    /// Soft-deletes a draft entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or `CanOnlyDeleteDraft`.
    pub async fn delete_entry<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        id: JournalEntryId,
    ) -> Result<(), LedgerError> {
        let mut entry = Self::load_entry(tx, tenant, id).await?;
        if entry.status != EntryStatus::Draft {
            return Err(LedgerError::CanOnlyDeleteDraft);
        }

        entry.is_deleted = true;
        entry.updated_at = Utc::now();
        tx.update_entry(&entry).await?;

        info!(entry_id = %id, tenant_id = %tenant, "Draft entry deleted");
        Ok(())
    }

    /// Per-account totals over every entry on the books.
    ///
    /// Drafts and deleted entries are excluded; reversed entries stay since
    /// their reversal offsets them.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn trial_balance<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        currency: Currency,
    ) -> Result<TrialBalance, LedgerError> {
        let accounts = tx.accounts(tenant).await?;
        let mut lines = Vec::new();
        for entry in tx.entries(tenant).await? {
            if entry.is_deleted || entry.status == EntryStatus::Draft {
                continue;
            }
            lines.extend(tx.lines(entry.id).await?);
        }
        Ok(TrialBalance::build(currency, &accounts, &lines))
    }
}
