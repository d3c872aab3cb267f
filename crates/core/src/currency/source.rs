//! External exchange-rate feeds.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use folio_shared::types::Currency;
use folio_shared::{AppResult, RateFeedClient};
use rust_decimal::Decimal;

/// A feed of current exchange rates.
///
/// Implementations do not retry; the resolver bounds every call with a timeout.
#[async_trait]
pub trait ExternalRateSource: Send + Sync + fmt::Debug {
    /// Latest rates quoted against `base` (1 base = rate quote-currency).
    async fn latest_rates(&self, base: Currency) -> AppResult<HashMap<Currency, Decimal>>;
}

#[async_trait]
impl ExternalRateSource for RateFeedClient {
    async fn latest_rates(&self, base: Currency) -> AppResult<HashMap<Currency, Decimal>> {
        RateFeedClient::latest_rates(self, base).await
    }
}
