//! Account balances and the trial balance.
//!
//! - Debit-normal accounts (Asset, Expense): balance = debit - credit
//! - Credit-normal accounts (Liability, Equity, Income): balance = credit - debit

use std::collections::BTreeMap;

use folio_shared::types::{AccountId, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{Account, NormalBalance};
use super::entry::JournalLine;

/// Totals for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Chart code.
    pub code: String,
    /// Normal side of the account.
    pub normal_balance: NormalBalance,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance signed by the normal side.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Creates an empty balance for an account.
    #[must_use]
    pub fn new(account: &Account) -> Self {
        Self {
            account_id: account.id,
            code: account.code.clone(),
            normal_balance: account.normal_balance,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Adds a debit/credit pair.
    pub fn apply(&mut self, debit: Decimal, credit: Decimal) {
        self.debit_total += debit;
        self.credit_total += credit;
        self.balance = self.normal_balance.signed(self.debit_total, self.credit_total);
    }
}

/// Per-account totals over a tenant's posted lines, in base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Base currency of the amounts.
    pub currency: Currency,
    /// Balances ordered by account code.
    pub accounts: Vec<AccountBalance>,
    /// Sum of all debits.
    pub total_debit: Decimal,
    /// Sum of all credits.
    pub total_credit: Decimal,
}

impl TrialBalance {
    /// Builds a trial balance from accounts and lines.
    ///
    /// Lines whose account is not in `accounts` are ignored.
    #[must_use]
    pub fn build<'a>(
        currency: Currency,
        accounts: &[Account],
        lines: impl IntoIterator<Item = &'a JournalLine>,
    ) -> Self {
        let mut balances: BTreeMap<AccountId, AccountBalance> = accounts
            .iter()
            .map(|a| (a.id, AccountBalance::new(a)))
            .collect();

        for line in lines {
            if let Some(balance) = balances.get_mut(&line.account_id) {
                balance.apply(line.debit, line.credit);
            }
        }

        let mut accounts: Vec<AccountBalance> = balances
            .into_values()
            .filter(|b| !b.debit_total.is_zero() || !b.credit_total.is_zero())
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debit = accounts.iter().map(|b| b.debit_total).sum();
        let total_credit = accounts.iter().map(|b| b.credit_total).sum();

        Self {
            currency,
            accounts,
            total_debit,
            total_credit,
        }
    }

    /// Returns true if total debits equal total credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }

    /// Looks up one account's balance.
    #[must_use]
    pub fn account(&self, account_id: AccountId) -> Option<&AccountBalance> {
        self.accounts.iter().find(|b| b.account_id == account_id)
    }
}
