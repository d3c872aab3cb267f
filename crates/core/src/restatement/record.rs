//! Amount-bearing records seen by restatement.

use std::collections::BTreeMap;

use folio_shared::types::{Money, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::DisplayAmount;

/// Kind of record carrying an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Customer invoice total.
    Invoice,
    /// Vendor bill total.
    Bill,
    /// Payment amount.
    Payment,
    /// Product list price.
    ProductPrice,
    /// Journal line amount.
    JournalLine,
    /// Account opening balance.
    OpeningBalance,
}

impl RecordKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Bill => "bill",
            Self::Payment => "payment",
            Self::ProductPrice => "product_price",
            Self::JournalLine => "journal_line",
            Self::OpeningBalance => "opening_balance",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "bill" => Some(Self::Bill),
            "payment" => Some(Self::Payment),
            "product_price" => Some(Self::ProductPrice),
            "journal_line" => Some(Self::JournalLine),
            "opening_balance" => Some(Self::OpeningBalance),
            _ => None,
        }
    }
}

/// Identifies one amount-bearing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Record kind.
    pub kind: RecordKind,
    /// Record id within its kind.
    pub id: Uuid,
}

impl RecordKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(kind: RecordKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// An amount as stored, plus its current restatement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRecord {
    /// Which record.
    pub key: RecordKey,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Authoritative amount. Restatement never writes it.
    pub original: Money,
    /// Display-only restatement.
    pub display: Option<DisplayAmount>,
}

/// Number of records touched, per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestatementSummary {
    /// Counts by kind.
    pub counts: BTreeMap<RecordKind, usize>,
}

impl RestatementSummary {
    /// Counts one record.
    pub fn record(&mut self, kind: RecordKind) {
        *self.counts.entry(kind).or_default() += 1;
    }

    /// Records touched of one kind.
    #[must_use]
    pub fn count(&self, kind: RecordKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Records touched overall.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
