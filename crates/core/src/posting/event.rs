//! Business events accepted by the posting engine.

use folio_shared::types::{AccountId, Currency, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::PostingError;
use crate::ledger::{ReferenceType, SourceRef};

/// A stocked product on a sale or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product moved.
    pub product_id: ProductId,
    /// Units moved.
    pub quantity: Decimal,
}

/// An economic event to be represented as one balanced entry.
///
/// `id` is the source document id; together with the event type it
/// identifies the entry, so posting the same document again amends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BusinessEvent {
    /// Customer invoice issued.
    Invoice {
        /// Invoice id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Net amount.
        subtotal: Decimal,
        /// Output tax.
        tax: Decimal,
        /// Stocked items sold, costed by FIFO.
        #[serde(default)]
        items: Vec<LineItem>,
    },
    /// Customer paid an invoice.
    InvoicePayment {
        /// Payment id.
        id: Uuid,
        /// Invoice paid.
        invoice_id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Amount received.
        amount: Decimal,
        /// Receiving account, defaults to the tenant's cash account.
        #[serde(default)]
        deposit_account_id: Option<AccountId>,
    },
    /// Vendor bill received.
    Bill {
        /// Bill id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Net amount.
        subtotal: Decimal,
        /// Input tax.
        tax: Decimal,
        /// Expense account, defaults to the tenant's general expense account.
        #[serde(default)]
        expense_account_id: Option<AccountId>,
    },
    /// Vendor bill paid.
    BillPayment {
        /// Payment id.
        id: Uuid,
        /// Bill paid.
        bill_id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Amount paid.
        amount: Decimal,
        /// Paying account, defaults to the tenant's cash account.
        #[serde(default)]
        payment_account_id: Option<AccountId>,
    },
    /// Payroll run paid.
    PayrollRun {
        /// Run id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Gross salaries.
        gross_pay: Decimal,
        /// Taxes and contributions withheld from employees.
        withholdings: Decimal,
        /// Employer-side contributions.
        employer_contributions: Decimal,
    },
    /// Dividend paid.
    DividendDistribution {
        /// Distribution id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Amount paid.
        amount: Decimal,
    },
    /// Owner withdrawal.
    OwnerDrawing {
        /// Drawing id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Amount withdrawn.
        amount: Decimal,
    },
    /// Refund paid to a customer.
    RefundDisbursement {
        /// Refund id.
        id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Amount paid.
        amount: Decimal,
    },
    /// Goods returned against an invoice.
    SalesReturn {
        /// Return id.
        id: Uuid,
        /// Invoice the goods were sold on.
        invoice_id: Uuid,
        /// Document currency.
        currency: Currency,
        /// Net value returned.
        returned_subtotal: Decimal,
        /// Net amount of the invoice.
        invoice_subtotal: Decimal,
        /// Tax amount of the invoice.
        invoice_tax: Decimal,
        /// Tax rate on the invoice lines, e.g. `0.11`.
        #[serde(default)]
        original_tax_rate: Option<Decimal>,
        /// Stocked items put back on the shelf.
        #[serde(default)]
        items: Vec<LineItem>,
    },
}

impl BusinessEvent {
    /// Event type name as used on the wire.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.reference_type().as_str()
    }

    /// Reference type of the resulting entry.
    #[must_use]
    pub const fn reference_type(&self) -> ReferenceType {
        match self {
            Self::Invoice { .. } => ReferenceType::Invoice,
            Self::InvoicePayment { .. } => ReferenceType::InvoicePayment,
            Self::Bill { .. } => ReferenceType::Bill,
            Self::BillPayment { .. } => ReferenceType::BillPayment,
            Self::PayrollRun { .. } => ReferenceType::PayrollPayment,
            Self::DividendDistribution { .. } => ReferenceType::DividendDistribution,
            Self::OwnerDrawing { .. } => ReferenceType::OwnerDrawing,
            Self::RefundDisbursement { .. } => ReferenceType::RefundDisbursement,
            Self::SalesReturn { .. } => ReferenceType::SalesReturn,
        }
    }

    /// Source document id.
    #[must_use]
    pub const fn source_id(&self) -> Uuid {
        match self {
            Self::Invoice { id, .. }
            | Self::InvoicePayment { id, .. }
            | Self::Bill { id, .. }
            | Self::BillPayment { id, .. }
            | Self::PayrollRun { id, .. }
            | Self::DividendDistribution { id, .. }
            | Self::OwnerDrawing { id, .. }
            | Self::RefundDisbursement { id, .. }
            | Self::SalesReturn { id, .. } => *id,
        }
    }

    /// Idempotency key of the resulting entry.
    #[must_use]
    pub const fn source_ref(&self) -> SourceRef {
        SourceRef::new(self.reference_type(), self.source_id())
    }

    /// Document currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        match self {
            Self::Invoice { currency, .. }
            | Self::InvoicePayment { currency, .. }
            | Self::Bill { currency, .. }
            | Self::BillPayment { currency, .. }
            | Self::PayrollRun { currency, .. }
            | Self::DividendDistribution { currency, .. }
            | Self::OwnerDrawing { currency, .. }
            | Self::RefundDisbursement { currency, .. }
            | Self::SalesReturn { currency, .. } => *currency,
        }
    }

    /// Stocked items moved by the event.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        match self {
            Self::Invoice { items, .. } | Self::SalesReturn { items, .. } => items,
            _ => &[],
        }
    }

    /// Checks the fields the variant's template relies on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` naming the first offending field.
    pub fn validate(&self) -> Result<(), PostingError> {
        let event_type = self.event_type();
        let fail = |reason: &str| {
            Err(PostingError::InvalidEvent {
                event_type,
                reason: reason.to_string(),
            })
        };

        match self {
            Self::Invoice { subtotal, tax, .. } | Self::Bill { subtotal, tax, .. } => {
                if subtotal.is_sign_negative() || tax.is_sign_negative() {
                    return fail("subtotal and tax must not be negative");
                }
                if (*subtotal + *tax).is_zero() {
                    return fail("document total must be positive");
                }
            }
            Self::InvoicePayment { amount, .. }
            | Self::BillPayment { amount, .. }
            | Self::DividendDistribution { amount, .. }
            | Self::OwnerDrawing { amount, .. }
            | Self::RefundDisbursement { amount, .. } => {
                if *amount <= Decimal::ZERO {
                    return fail("amount must be positive");
                }
            }
            Self::PayrollRun {
                gross_pay,
                withholdings,
                employer_contributions,
                ..
            } => {
                if *gross_pay <= Decimal::ZERO {
                    return fail("gross_pay must be positive");
                }
                if withholdings.is_sign_negative() || employer_contributions.is_sign_negative() {
                    return fail("withholdings and employer_contributions must not be negative");
                }
                if withholdings > gross_pay {
                    return fail("withholdings exceed gross_pay");
                }
            }
            Self::SalesReturn {
                returned_subtotal,
                invoice_subtotal,
                invoice_tax,
                original_tax_rate,
                ..
            } => {
                if *returned_subtotal <= Decimal::ZERO {
                    return fail("returned_subtotal must be positive");
                }
                if *invoice_subtotal <= Decimal::ZERO || invoice_tax.is_sign_negative() {
                    return fail("invoice_subtotal must be positive and invoice_tax not negative");
                }
                if returned_subtotal > invoice_subtotal {
                    return fail("returned_subtotal exceeds invoice_subtotal");
                }
                if original_tax_rate.is_some_and(|r| r.is_sign_negative()) {
                    return fail("original_tax_rate must not be negative");
                }
            }
        }

        let items = self.items();
        if items.iter().any(|i| i.quantity <= Decimal::ZERO) {
            return fail("item quantities must be positive");
        }
        if matches!(self, Self::SalesReturn { .. })
            && items
                .iter()
                .enumerate()
                .any(|(i, item)| items[..i].iter().any(|prev| prev.product_id == item.product_id))
        {
            return fail("a product may appear only once per return");
        }
        Ok(())
    }
}
