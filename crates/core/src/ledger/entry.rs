//! Journal entry domain types.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{AccountId, Currency, JournalEntryId, JournalLineId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of source document an entry was posted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// Customer invoice issued.
    Invoice,
    /// Customer payment received.
    InvoicePayment,
    /// Vendor bill received.
    Bill,
    /// Vendor bill paid.
    BillPayment,
    /// Payroll run paid.
    PayrollPayment,
    /// Dividend paid to shareholders.
    DividendDistribution,
    /// Owner withdrawal.
    OwnerDrawing,
    /// Refund paid to a customer.
    RefundDisbursement,
    /// Goods returned by a customer.
    SalesReturn,
    /// Stock count adjustment.
    InventoryReconciliation,
    /// Reversal of another entry.
    Reversal,
    /// Manual journal.
    Manual,
}

impl ReferenceType {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::InvoicePayment => "invoice_payment",
            Self::Bill => "bill",
            Self::BillPayment => "bill_payment",
            Self::PayrollPayment => "payroll_payment",
            Self::DividendDistribution => "dividend_distribution",
            Self::OwnerDrawing => "owner_drawing",
            Self::RefundDisbursement => "refund_disbursement",
            Self::SalesReturn => "sales_return",
            Self::InventoryReconciliation => "inventory_reconciliation",
            Self::Reversal => "reversal",
            Self::Manual => "manual",
        }
    }

    /// Parses a reference type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "invoice_payment" => Some(Self::InvoicePayment),
            "bill" => Some(Self::Bill),
            "bill_payment" => Some(Self::BillPayment),
            "payroll_payment" => Some(Self::PayrollPayment),
            "dividend_distribution" => Some(Self::DividendDistribution),
            "owner_drawing" => Some(Self::OwnerDrawing),
            "refund_disbursement" => Some(Self::RefundDisbursement),
            "sales_return" => Some(Self::SalesReturn),
            "inventory_reconciliation" => Some(Self::InventoryReconciliation),
            "reversal" => Some(Self::Reversal),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link from an entry to the document that produced it.
///
/// `(tenant, reference_type, reference_id)` identifies at most one live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document kind.
    pub reference_type: ReferenceType,
    /// Document id. `None` for manual journals.
    pub reference_id: Option<Uuid>,
}

impl SourceRef {
    /// Creates a reference to a document.
    #[must_use]
    pub const fn new(reference_type: ReferenceType, reference_id: Uuid) -> Self {
        Self {
            reference_type,
            reference_id: Some(reference_id),
        }
    }

    /// Reference for a manual journal.
    #[must_use]
    pub const fn manual() -> Self {
        Self {
            reference_type: ReferenceType::Manual,
            reference_id: None,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reference_id {
            Some(id) => write!(f, "{}:{id}", self.reference_type),
            None => write!(f, "{}", self.reference_type),
        }
    }
}

/// Entry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Editable, not yet on the books.
    Draft,
    /// On the books.
    Posted,
    /// Offset by a reversal entry.
    Reversed,
}

impl EntryStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }
}

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit.
    Debit,
    /// Credit.
    Credit,
}

/// Amount as stated on the source document, before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalAmount {
    /// Document currency.
    pub currency: Currency,
    /// Amount in document currency.
    pub amount: Decimal,
    /// Rate applied (1 document unit = rate base units).
    pub rate: Decimal,
}

/// Restated amount for display. Never used for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAmount {
    /// Display currency.
    pub currency: Currency,
    /// Restated amount.
    pub amount: Decimal,
    /// Rate applied to the original amount.
    pub rate: Decimal,
}

/// A journal entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Source document.
    pub reference: SourceRef,
    /// Narrative.
    pub description: String,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Entry this one reverses.
    pub reversal_of: Option<JournalEntryId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A journal line.
///
/// Exactly one of `debit`/`credit` is non-zero and both are non-negative.
/// Amounts are in the tenant's base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// Owning entry.
    pub entry_id: JournalEntryId,
    /// Account posted to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Document-currency amount, for foreign-currency lines.
    pub original: Option<OriginalAmount>,
    /// Restated amount.
    pub display: Option<DisplayAmount>,
    /// Line narrative.
    pub description: Option<String>,
}

impl JournalLine {
    /// Returns which side the line is on.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        if self.debit > Decimal::ZERO {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }

    /// Returns the non-zero amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }

    /// Returns the line as it would be submitted.
    #[must_use]
    pub fn to_new_line(&self) -> NewLine {
        NewLine {
            account_id: self.account_id,
            debit: self.debit,
            credit: self.credit,
            original: self.original,
            description: self.description.clone(),
        }
    }
}

/// Header of an entry to commit.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Source document.
    pub reference: SourceRef,
    /// Narrative.
    pub description: String,
    /// Initial status, `Posted` or `Draft`.
    pub status: EntryStatus,
}

/// A line of an entry to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount in base currency.
    pub debit: Decimal,
    /// Credit amount in base currency.
    pub credit: Decimal,
    /// Document-currency amount.
    pub original: Option<OriginalAmount>,
    /// Line narrative.
    pub description: Option<String>,
}

impl NewLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            original: None,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            original: None,
            description: None,
        }
    }

    /// Attaches the document-currency amount.
    #[must_use]
    pub fn with_original(mut self, original: OriginalAmount) -> Self {
        self.original = Some(original);
        self
    }

    /// Attaches a narrative.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
