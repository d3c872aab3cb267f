//! Display-currency restatement of amount-bearing records.
//!
//! Restated amounts live in separate display fields and never feed
//! accounting.

pub mod record;
pub mod service;

pub use record::{AmountRecord, RecordKey, RecordKind, RestatementSummary};
pub use service::{RestatementService, restated};
