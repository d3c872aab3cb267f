//! Multi-currency handling and exchange rates.

pub mod allocation;
pub mod conversion;
pub mod error;
pub mod exchange;
pub mod resolver;
pub mod source;

#[cfg(test)]
mod props;

pub use allocation::AllocationUtil;
pub use conversion::convert_amount;
pub use error::CurrencyError;
pub use exchange::{ExchangeRate, RateQuote, RateSource, RateStep, pick_stored_rate};
pub use resolver::RateResolver;
pub use source::ExternalRateSource;
