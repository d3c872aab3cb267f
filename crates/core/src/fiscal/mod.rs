//! Accounting periods and the period guard.

pub mod error;
pub mod guard;
pub mod period;

pub use error::FiscalError;
pub use guard::{
    PeriodClassification, classify, ensure_postable, validate_new_period, validate_transition,
};
pub use period::{AccountingPeriod, PeriodStatus};
