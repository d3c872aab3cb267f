//! `SeaORM` entities, one module per table.

pub mod accounting_periods;
pub mod accounts;
pub mod amount_records;
pub mod approval_requests;
pub mod audit_outbox;
pub mod cost_lots;
pub mod exchange_rates;
pub mod journal_entries;
pub mod journal_lines;
pub mod lot_consumptions;
pub mod sales_returns;
pub mod source_document_links;
pub mod tenants;

pub mod prelude {
    //! Entity aliases.
    pub use super::accounting_periods::Entity as AccountingPeriods;
    pub use super::accounts::Entity as Accounts;
    pub use super::amount_records::Entity as AmountRecords;
    pub use super::approval_requests::Entity as ApprovalRequests;
    pub use super::audit_outbox::Entity as AuditOutbox;
    pub use super::cost_lots::Entity as CostLots;
    pub use super::exchange_rates::Entity as ExchangeRates;
    pub use super::journal_entries::Entity as JournalEntries;
    pub use super::journal_lines::Entity as JournalLines;
    pub use super::lot_consumptions::Entity as LotConsumptions;
    pub use super::sales_returns::Entity as SalesReturns;
    pub use super::source_document_links::Entity as SourceDocumentLinks;
    pub use super::tenants::Entity as Tenants;
}
