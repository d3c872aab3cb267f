//! Currency error types.

use chrono::NaiveDate;
use folio_shared::types::Currency;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while resolving rates or converting amounts.
#[derive(Debug, Error)]
pub enum CurrencyError {
    /// No rate could be found by any resolution step.
    #[error("No exchange rate found for {from} to {to} on {date}")]
    RateNotFound {
        /// Source currency.
        from: Currency,
        /// Target currency.
        to: Currency,
        /// Requested date.
        date: NaiveDate,
    },

    /// Exchange rate must be positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),

    /// Currency code is not usable.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CurrencyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RateNotFound { .. } => "RATE_NOT_FOUND",
            Self::InvalidRate(_) => "INVALID_RATE",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::RateNotFound { .. } => 422,
            Self::InvalidRate(_) | Self::InvalidCurrency(_) => 400,
            Self::Store(e) => e.http_status_code(),
        }
    }
}
