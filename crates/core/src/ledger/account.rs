//! Chart of accounts.

use folio_shared::types::{AccountId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::DisplayAmount;

/// Top-level account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Revenue and other income.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Returns the side on which this account type increases.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses an account type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "income" | "revenue" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// Normal balance side of an account.
///
/// - Debit-normal (Asset, Expense): balance += debit - credit
/// - Credit-normal (Liability, Equity, Income): balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Increases with debits.
    Debit,
    /// Increases with credits.
    Credit,
}

impl NormalBalance {
    /// Signed balance change of a debit/credit pair.
    #[must_use]
    pub fn signed(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Role an account plays in automated postings.
///
/// Posting templates look accounts up by subtype so each tenant can keep its
/// own codes and names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSubtype {
    /// Cash and bank.
    Cash,
    /// Customer receivables.
    AccountsReceivable,
    /// Stock on hand at cost.
    Inventory,
    /// Input tax recoverable on purchases.
    VatReceivable,
    /// Vendor payables.
    AccountsPayable,
    /// Output tax collected on sales.
    VatPayable,
    /// Payroll withholdings and employer contributions owed.
    PayrollLiabilities,
    /// Accumulated profits.
    RetainedEarnings,
    /// Owner withdrawals (contra-equity).
    OwnerDrawings,
    /// Sales revenue.
    Revenue,
    /// Sales returns and refunds (contra-revenue).
    SalesReturns,
    /// Cost of goods sold.
    Cogs,
    /// Default purchase expense.
    Expense,
    /// Gross salaries.
    SalaryExpense,
    /// Employer payroll contributions.
    PayrollTaxExpense,
    /// Counterpart of inventory count adjustments.
    InventoryAdjustment,
}

impl AccountSubtype {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::AccountsReceivable => "accounts_receivable",
            Self::Inventory => "inventory",
            Self::VatReceivable => "vat_receivable",
            Self::AccountsPayable => "accounts_payable",
            Self::VatPayable => "vat_payable",
            Self::PayrollLiabilities => "payroll_liabilities",
            Self::RetainedEarnings => "retained_earnings",
            Self::OwnerDrawings => "owner_drawings",
            Self::Revenue => "revenue",
            Self::SalesReturns => "sales_returns",
            Self::Cogs => "cogs",
            Self::Expense => "expense",
            Self::SalaryExpense => "salary_expense",
            Self::PayrollTaxExpense => "payroll_tax_expense",
            Self::InventoryAdjustment => "inventory_adjustment",
        }
    }

    /// Parses a subtype from a string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|subtype| subtype.as_str() == s)
    }

    /// Every subtype, in chart order.
    pub const ALL: [Self; 16] = [
        Self::Cash,
        Self::AccountsReceivable,
        Self::Inventory,
        Self::VatReceivable,
        Self::AccountsPayable,
        Self::VatPayable,
        Self::PayrollLiabilities,
        Self::RetainedEarnings,
        Self::OwnerDrawings,
        Self::Revenue,
        Self::SalesReturns,
        Self::Cogs,
        Self::Expense,
        Self::SalaryExpense,
        Self::PayrollTaxExpense,
        Self::InventoryAdjustment,
    ];

    /// Account type a chart account of this subtype normally has.
    #[must_use]
    pub const fn account_type(self) -> AccountType {
        match self {
            Self::Cash | Self::AccountsReceivable | Self::Inventory | Self::VatReceivable => {
                AccountType::Asset
            }
            Self::AccountsPayable | Self::VatPayable | Self::PayrollLiabilities => {
                AccountType::Liability
            }
            Self::RetainedEarnings | Self::OwnerDrawings => AccountType::Equity,
            Self::Revenue | Self::SalesReturns => AccountType::Income,
            Self::Cogs
            | Self::Expense
            | Self::SalaryExpense
            | Self::PayrollTaxExpense
            | Self::InventoryAdjustment => AccountType::Expense,
        }
    }
}

impl std::fmt::Display for AccountSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Chart code (e.g. "1100").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Posting role, if the account is used by templates.
    pub subtype: Option<AccountSubtype>,
    /// Side on which the account increases. Always derived from `account_type`.
    pub normal_balance: NormalBalance,
    /// Inactive accounts reject new lines.
    pub is_active: bool,
    /// Parent account in the chart hierarchy.
    pub parent_id: Option<AccountId>,
    /// Opening balance in the tenant's base currency, signed by normal side.
    pub opening_balance: Decimal,
    /// Restated opening balance.
    pub opening_balance_display: Option<DisplayAmount>,
}

impl Account {
    /// Creates an active account with a normal balance consistent with its type.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: AccountId::new(),
            tenant_id,
            code: code.into(),
            name: name.into(),
            account_type,
            subtype: None,
            normal_balance: account_type.normal_balance(),
            is_active: true,
            parent_id: None,
            opening_balance: Decimal::ZERO,
            opening_balance_display: None,
        }
    }

    /// Creates the standard account for a posting subtype.
    #[must_use]
    pub fn for_subtype(
        tenant_id: TenantId,
        code: impl Into<String>,
        name: impl Into<String>,
        subtype: AccountSubtype,
    ) -> Self {
        Self::new(tenant_id, code, name, subtype.account_type()).with_subtype(subtype)
    }

    /// Sets the posting subtype.
    #[must_use]
    pub fn with_subtype(mut self, subtype: AccountSubtype) -> Self {
        self.subtype = Some(subtype);
        self
    }

    /// Sets the opening balance.
    #[must_use]
    pub fn with_opening_balance(mut self, amount: Decimal) -> Self {
        self.opening_balance = amount;
        self
    }

    /// Report-sign effect of a debit/credit pair on this account.
    #[must_use]
    pub fn signed_effect(&self, debit: Decimal, credit: Decimal) -> Decimal {
        self.normal_balance.signed(debit, credit)
    }
}
