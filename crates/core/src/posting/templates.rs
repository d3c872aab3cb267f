//! Journal line templates per event type, and their conversion to base
//! currency.
//!
//! | Event | Debit | Credit |
//! |---|---|---|
//! | invoice | receivable (total) | revenue (subtotal), output VAT (tax) |
//! | invoice payment | deposit account | receivable |
//! | bill | expense (subtotal), input VAT (tax) | payable (total) |
//! | bill payment | payable | payment account |
//! | payroll run | salaries (gross), payroll tax (employer) | payroll liabilities, cash (net) |
//! | dividend | retained earnings | cash |
//! | owner drawing | owner drawings | cash |
//! | refund | sales returns | cash |
//! | sales return | sales returns, output VAT share | receivable |
//!
//! Sold and returned stock adds a cost pair in base currency.

use folio_shared::config::ReturnTaxPolicy;
use folio_shared::types::{AccountId, Currency, round_half_up};
use rust_decimal::Decimal;

use super::error::PostingError;
use super::event::BusinessEvent;
use crate::currency::{AllocationUtil, convert_amount};
use crate::ledger::{AccountSubtype, EntryType, OriginalAmount};

/// Where a template line posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSlot {
    /// The tenant's account for a subtype.
    Subtype(AccountSubtype),
    /// An account named on the event.
    Explicit(AccountId),
}

impl AccountSlot {
    fn or_default(explicit: Option<AccountId>, subtype: AccountSubtype) -> Self {
        explicit.map_or(Self::Subtype(subtype), Self::Explicit)
    }
}

/// Currency a template amount is stated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// Document currency, converted at the resolved rate.
    Document,
    /// Already in base currency (FIFO cost).
    Base,
}

/// One line of a template before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLine {
    /// Target account.
    pub slot: AccountSlot,
    /// Side.
    pub side: EntryType,
    /// Amount in `basis`.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub basis: Basis,
    /// Line narrative.
    pub description: &'static str,
}

impl TemplateLine {
    const fn document(
        slot: AccountSlot,
        side: EntryType,
        amount: Decimal,
        description: &'static str,
    ) -> Self {
        Self {
            slot,
            side,
            amount,
            basis: Basis::Document,
            description,
        }
    }

    const fn base(
        subtype: AccountSubtype,
        side: EntryType,
        amount: Decimal,
        description: &'static str,
    ) -> Self {
        Self {
            slot: AccountSlot::Subtype(subtype),
            side,
            amount,
            basis: Basis::Base,
            description,
        }
    }
}

/// A line converted to base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    /// Target account.
    pub slot: AccountSlot,
    /// Side.
    pub side: EntryType,
    /// Base-currency amount.
    pub amount: Decimal,
    /// Document amount, for foreign-currency document lines.
    pub original: Option<OriginalAmount>,
    /// Line narrative.
    pub description: &'static str,
}

/// Output tax reversed by a sales return, in document currency.
///
/// # Errors
///
/// Returns `InvalidEvent` when `OriginalRate` applies and the event carries
/// no `original_tax_rate`.
pub fn return_tax_share(
    returned_subtotal: Decimal,
    invoice_subtotal: Decimal,
    invoice_tax: Decimal,
    original_tax_rate: Option<Decimal>,
    policy: ReturnTaxPolicy,
    decimals: u32,
) -> Result<Decimal, PostingError> {
    let share = match policy {
        ReturnTaxPolicy::CurrentRatio => returned_subtotal * invoice_tax / invoice_subtotal,
        ReturnTaxPolicy::OriginalRate => {
            let rate = original_tax_rate.ok_or_else(|| PostingError::InvalidEvent {
                event_type: "sales_return",
                reason: "original_tax_rate is required by the return tax policy".to_string(),
            })?;
            returned_subtotal * rate
        }
    };
    Ok(round_half_up(share, decimals))
}

/// Document-currency lines of `event`.
///
/// Debits and credits balance exactly in document currency.
///
/// # Errors
///
/// See [`return_tax_share`].
pub fn document_lines(
    event: &BusinessEvent,
    policy: ReturnTaxPolicy,
    decimals: u32,
) -> Result<Vec<TemplateLine>, PostingError> {
    use AccountSubtype as S;
    use EntryType::{Credit, Debit};

    let sub = AccountSlot::Subtype;
    let lines = match *event {
        BusinessEvent::Invoice { subtotal, tax, .. } => vec![
            TemplateLine::document(
                sub(S::AccountsReceivable),
                Debit,
                subtotal + tax,
                "Invoice receivable",
            ),
            TemplateLine::document(sub(S::Revenue), Credit, subtotal, "Sales revenue"),
            TemplateLine::document(sub(S::VatPayable), Credit, tax, "Output VAT"),
        ],
        BusinessEvent::InvoicePayment {
            amount,
            deposit_account_id,
            ..
        } => vec![
            TemplateLine::document(
                AccountSlot::or_default(deposit_account_id, S::Cash),
                Debit,
                amount,
                "Payment received",
            ),
            TemplateLine::document(sub(S::AccountsReceivable), Credit, amount, "Invoice settled"),
        ],
        BusinessEvent::Bill {
            subtotal,
            tax,
            expense_account_id,
            ..
        } => vec![
            TemplateLine::document(
                AccountSlot::or_default(expense_account_id, S::Expense),
                Debit,
                subtotal,
                "Bill expense",
            ),
            TemplateLine::document(sub(S::VatReceivable), Debit, tax, "Input VAT"),
            TemplateLine::document(sub(S::AccountsPayable), Credit, subtotal + tax, "Bill payable"),
        ],
        BusinessEvent::BillPayment {
            amount,
            payment_account_id,
            ..
        } => vec![
            TemplateLine::document(sub(S::AccountsPayable), Debit, amount, "Bill settled"),
            TemplateLine::document(
                AccountSlot::or_default(payment_account_id, S::Cash),
                Credit,
                amount,
                "Payment made",
            ),
        ],
        BusinessEvent::PayrollRun {
            gross_pay,
            withholdings,
            employer_contributions,
            ..
        } => vec![
            TemplateLine::document(sub(S::SalaryExpense), Debit, gross_pay, "Gross salaries"),
            TemplateLine::document(
                sub(S::PayrollTaxExpense),
                Debit,
                employer_contributions,
                "Employer contributions",
            ),
            TemplateLine::document(
                sub(S::PayrollLiabilities),
                Credit,
                withholdings + employer_contributions,
                "Payroll liabilities",
            ),
            TemplateLine::document(sub(S::Cash), Credit, gross_pay - withholdings, "Net pay"),
        ],
        BusinessEvent::DividendDistribution { amount, .. } => vec![
            TemplateLine::document(sub(S::RetainedEarnings), Debit, amount, "Dividend declared"),
            TemplateLine::document(sub(S::Cash), Credit, amount, "Dividend paid"),
        ],
        BusinessEvent::OwnerDrawing { amount, .. } => vec![
            TemplateLine::document(sub(S::OwnerDrawings), Debit, amount, "Owner drawing"),
            TemplateLine::document(sub(S::Cash), Credit, amount, "Cash withdrawn"),
        ],
        BusinessEvent::RefundDisbursement { amount, .. } => vec![
            TemplateLine::document(sub(S::SalesReturns), Debit, amount, "Customer refund"),
            TemplateLine::document(sub(S::Cash), Credit, amount, "Refund paid"),
        ],
        BusinessEvent::SalesReturn {
            returned_subtotal,
            invoice_subtotal,
            invoice_tax,
            original_tax_rate,
            ..
        } => {
            let tax = return_tax_share(
                returned_subtotal,
                invoice_subtotal,
                invoice_tax,
                original_tax_rate,
                policy,
                decimals,
            )?;
            vec![
                TemplateLine::document(
                    sub(S::SalesReturns),
                    Debit,
                    returned_subtotal,
                    "Goods returned",
                ),
                TemplateLine::document(sub(S::VatPayable), Debit, tax, "Output VAT reversed"),
                TemplateLine::document(
                    sub(S::AccountsReceivable),
                    Credit,
                    returned_subtotal + tax,
                    "Receivable reduced",
                ),
            ]
        }
    };
    Ok(lines)
}

/// Cost of goods sold against inventory, in base currency.
#[must_use]
pub const fn sale_cost_lines(cost: Decimal) -> [TemplateLine; 2] {
    [
        TemplateLine::base(AccountSubtype::Cogs, EntryType::Debit, cost, "Cost of goods sold"),
        TemplateLine::base(AccountSubtype::Inventory, EntryType::Credit, cost, "Inventory issued"),
    ]
}

/// Returned stock put back into inventory, in base currency.
#[must_use]
pub const fn return_cost_lines(cost: Decimal) -> [TemplateLine; 2] {
    [
        TemplateLine::base(
            AccountSubtype::Inventory,
            EntryType::Debit,
            cost,
            "Inventory restocked",
        ),
        TemplateLine::base(AccountSubtype::Cogs, EntryType::Credit, cost, "Cost of goods returned"),
    ]
}

/// Converts template lines to base currency and drops zero lines.
///
/// Document lines of each side are converted as one total, then split back
/// over the lines by their document amounts, so both sides stay equal after
/// rounding. `foreign` attaches the document amount to each converted line.
#[must_use]
pub fn price_lines(
    lines: &[TemplateLine],
    currency: Currency,
    rate: Decimal,
    foreign: bool,
    base_decimals: u32,
) -> Vec<PricedLine> {
    let mut amounts: Vec<Decimal> = lines
        .iter()
        .map(|l| match l.basis {
            Basis::Base => round_half_up(l.amount, base_decimals),
            Basis::Document => Decimal::ZERO,
        })
        .collect();

    for side in [EntryType::Debit, EntryType::Credit] {
        let indices: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.side == side && l.basis == Basis::Document)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        let weights: Vec<Decimal> = indices.iter().map(|&i| lines[i].amount).collect();
        let total = convert_amount(weights.iter().copied().sum(), rate, base_decimals);
        let shares = AllocationUtil::allocate_by_weights(total, &weights, base_decimals);
        for (i, share) in indices.into_iter().zip(shares) {
            amounts[i] = share;
        }
    }

    lines
        .iter()
        .zip(amounts)
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(line, amount)| PricedLine {
            slot: line.slot,
            side: line.side,
            amount,
            original: (foreign && line.basis == Basis::Document).then_some(OriginalAmount {
                currency,
                amount: line.amount,
                rate,
            }),
            description: line.description,
        })
        .collect()
}
