//! Posting engine: business events in, balanced journal entries out.
//!
//! [`PostingEngine`] is the only writer of the ledger. It resolves rates,
//! moves FIFO stock, checks the period guard and records an audit event in
//! the same transaction as the change.

pub mod engine;
pub mod error;
pub mod event;
pub mod returns;
pub mod templates;

pub use engine::{PostingEngine, PostingOutcome, ReconcileOutcome};
pub use error::PostingError;
pub use event::{BusinessEvent, LineItem};
pub use returns::{ReturnRecord, check_return};
pub use templates::{
    AccountSlot, PricedLine, TemplateLine, document_lines, price_lines, return_tax_share,
};
