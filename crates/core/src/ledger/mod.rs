//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Chart of accounts and normal balances
//! - Journal entries, lines and document references
//! - Line and balance validation
//! - Reversals and the trial balance
//! - The ledger service, sole writer of journal entries

pub mod account;
pub mod balance;
pub mod entry;
pub mod error;
pub mod reversal;
pub mod service;
pub mod tenant;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use account::{Account, AccountSubtype, AccountType, NormalBalance};
pub use balance::{AccountBalance, TrialBalance};
pub use entry::{
    DisplayAmount, EntryStatus, EntryType, JournalEntry, JournalLine, NewEntry, NewLine,
    OriginalAmount, ReferenceType, SourceRef,
};
pub use error::LedgerError;
pub use reversal::reversing_lines;
pub use service::{LedgerService, materialize_lines};
pub use tenant::TenantProfile;
pub use validation::{EntryTotals, validate_accounts, validate_line, validate_lines};
