//! Business rule validation for journal lines.

use std::collections::HashMap;

use folio_shared::types::{AccountId, TenantId};
use rust_decimal::Decimal;

use super::account::Account;
use super::entry::NewLine;
use super::error::LedgerError;

/// Debit and credit totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl EntryTotals {
    /// Sums the lines.
    #[must_use]
    pub fn of(lines: &[NewLine]) -> Self {
        Self {
            debit: lines.iter().map(|l| l.debit).sum(),
            credit: lines.iter().map(|l| l.credit).sum(),
        }
    }

    /// Absolute difference between the sides.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        (self.debit - self.credit).abs()
    }

    /// Returns true if the difference is within `tolerance`.
    #[must_use]
    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.difference() <= tolerance
    }
}

/// Validates the shape of a single line.
///
/// # Errors
///
/// Returns `InvalidLine` if an amount is negative, both sides are set, or
/// neither is.
pub fn validate_line(index: usize, line: &NewLine) -> Result<(), LedgerError> {
    let invalid = |reason: &str| LedgerError::InvalidLine {
        index,
        reason: reason.to_string(),
    };

    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(invalid("amounts must not be negative"));
    }
    match (line.debit.is_zero(), line.credit.is_zero()) {
        (true, true) => Err(invalid("line amount cannot be zero")),
        (false, false) => Err(invalid("line must be either debit or credit, not both")),
        _ => Ok(()),
    }
}

/// Validates line count, line shapes and balance.
///
/// Entries are never auto-balanced: anything beyond `tolerance` is rejected.
///
/// # Errors
///
/// Returns the first rule violated.
pub fn validate_lines(lines: &[NewLine], tolerance: Decimal) -> Result<EntryTotals, LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::InsufficientLines);
    }

    for (index, line) in lines.iter().enumerate() {
        validate_line(index, line)?;
    }

    let totals = EntryTotals::of(lines);
    if !totals.is_balanced(tolerance) {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
            difference: totals.difference(),
        });
    }

    Ok(totals)
}

/// Validates that every line's account exists, is active and belongs to `tenant`.
///
/// # Errors
///
/// Returns `AccountNotFound`, `AccountTenantMismatch` or `AccountInactive`.
pub fn validate_accounts(
    tenant: TenantId,
    lines: &[NewLine],
    accounts: &HashMap<AccountId, Account>,
) -> Result<(), LedgerError> {
    for line in lines {
        let account = accounts
            .get(&line.account_id)
            .ok_or(LedgerError::AccountNotFound(line.account_id))?;

        if account.tenant_id != tenant {
            return Err(LedgerError::AccountTenantMismatch {
                account_id: account.id,
                tenant_id: tenant,
            });
        }
        if !account.is_active {
            return Err(LedgerError::AccountInactive(account.id));
        }
    }
    Ok(())
}
