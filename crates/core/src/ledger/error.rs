//! Ledger error types for validation and state errors.

use chrono::NaiveDate;
use folio_shared::types::{AccountId, JournalEntryId, PeriodId, TenantId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry is not balanced beyond the configured tolerance.
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}, Difference: {difference}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
        /// Absolute difference.
        difference: Decimal,
    },

    /// A line violates the debit/credit shape rules.
    #[error("Line {index} is invalid: {reason}")]
    InvalidLine {
        /// Zero-based position of the line.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account belongs to another tenant.
    #[error("Account {account_id} does not belong to tenant {tenant_id}")]
    AccountTenantMismatch {
        /// The account.
        account_id: AccountId,
        /// The tenant of the entry.
        tenant_id: TenantId,
    },

    // ========== Period Errors ==========
    /// The date falls in a closed period.
    #[error("Period {period} is closed, cannot post on {date}")]
    PeriodClosed {
        /// Posting date.
        date: NaiveDate,
        /// Covering period.
        period: PeriodId,
    },

    /// The date falls in a locked period.
    #[error("Period {period} is locked, cannot post on {date}")]
    PeriodLocked {
        /// Posting date.
        date: NaiveDate,
        /// Covering period.
        period: PeriodId,
    },

    /// No period covers the date.
    #[error("No accounting period defined for {0}")]
    NoPeriodDefined(NaiveDate),

    // ========== Entry State Errors ==========
    /// Entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Can only delete draft entries.
    #[error("Can only delete draft entries")]
    CanOnlyDeleteDraft,

    /// Entry was already reversed.
    #[error("Journal entry {0} is already reversed")]
    AlreadyReversed(JournalEntryId),

    /// Operation requires a posted entry.
    #[error("Journal entry {0} is not posted")]
    NotPosted(JournalEntryId),

    // ========== Storage Errors ==========
    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountTenantMismatch { .. } => "ACCOUNT_TENANT_MISMATCH",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::NoPeriodDefined(_) => "NO_PERIOD_DEFINED",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::CanOnlyDeleteDraft => "CAN_ONLY_DELETE_DRAFT",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLines
            | Self::Unbalanced { .. }
            | Self::InvalidLine { .. }
            | Self::AccountInactive(_)
            | Self::NoPeriodDefined(_) => 400,

            // 403 Forbidden - cross-tenant access
            Self::AccountTenantMismatch { .. } => 403,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::PeriodClosed { .. }
            | Self::PeriodLocked { .. }
            | Self::CanOnlyDeleteDraft
            | Self::AlreadyReversed(_)
            | Self::NotPosted(_) => 409,

            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
