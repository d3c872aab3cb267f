//! Accounting period error types.

use chrono::NaiveDate;
use folio_shared::types::PeriodId;
use thiserror::Error;

use super::period::PeriodStatus;

/// Errors raised when defining or transitioning periods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiscalError {
    /// Start date is after end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// The new period overlaps an existing one.
    #[error("Period overlaps existing period {0}")]
    OverlappingPeriod(PeriodId),

    /// The new period leaves a gap in the calendar.
    #[error("Period must start on {expected_start} or end on {expected_end}")]
    NonContiguousPeriod {
        /// Day after the last existing period.
        expected_start: NaiveDate,
        /// Day before the first existing period.
        expected_end: NaiveDate,
    },

    /// Status change not allowed.
    #[error("Cannot move period from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: PeriodStatus,
        /// Requested status.
        to: PeriodStatus,
    },

    /// An earlier period is still open.
    #[error("Cannot close period: earlier period {0} is still open")]
    EarlierPeriodsOpen(PeriodId),

    /// Period not found.
    #[error("Period not found: {0}")]
    PeriodNotFound(PeriodId),
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OverlappingPeriod(_) => "OVERLAPPING_PERIOD",
            Self::NonContiguousPeriod { .. } => "NON_CONTIGUOUS_PERIOD",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::EarlierPeriodsOpen(_) => "EARLIER_PERIODS_OPEN",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. } | Self::NonContiguousPeriod { .. } => 400,
            Self::PeriodNotFound(_) => 404,
            Self::OverlappingPeriod(_)
            | Self::InvalidStatusTransition { .. }
            | Self::EarlierPeriodsOpen(_) => 409,
        }
    }
}
