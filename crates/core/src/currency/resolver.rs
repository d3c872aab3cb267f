//! Exchange rate resolution with caching and a fixed fallback chain.
//!
//! Order: same currency, cache, stored rate, stored inverse rate, external
//! feed. External results are persisted inside the caller's transaction and
//! only reach the cache once that row has been committed and read back.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use folio_shared::config::RatesConfig;
use folio_shared::types::{Currency, TenantId};
use moka::sync::Cache;
use tracing::{debug, warn};

use super::error::CurrencyError;
use super::exchange::{ExchangeRate, RateQuote, RateSource, RateStep, pick_stored_rate};
use super::source::ExternalRateSource;
use crate::store::LedgerTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RateKey {
    tenant: TenantId,
    from: Currency,
    to: Currency,
    date: NaiveDate,
}

/// Resolves exchange rates for postings.
///
/// The cache is process-local and advisory: it only shortens bursts of
/// identical lookups and is never written back to storage. Only quotes read
/// from stored rows are cached; a feed quote lives in the caller's
/// transaction until it commits.
#[derive(Clone)]
pub struct RateResolver {
    cache: Cache<RateKey, RateQuote>,
    source: Option<Arc<dyn ExternalRateSource>>,
    timeout: Duration,
}

impl std::fmt::Debug for RateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateResolver")
            .field("cached", &self.cache.entry_count())
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RateResolver {
    /// Creates a resolver without an external feed.
    #[must_use]
    pub fn new(config: &RatesConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs))
            .build();

        Self {
            cache,
            source: None,
            timeout: Duration::from_millis(config.feed_timeout_ms),
        }
    }

    /// Attaches an external feed used as the last resolution step.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ExternalRateSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Drops every cached quote.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Resolves the rate `from -> to` applicable on `date` for `tenant`.
    ///
    /// # Errors
    ///
    /// Returns `RateNotFound` when every step fails, including a feed error or
    /// timeout, and `Store` on storage failures.
    pub async fn resolve<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        date: NaiveDate,
    ) -> Result<RateQuote, CurrencyError> {
        if from == to {
            return Ok(RateQuote::same_currency(from, date));
        }

        let key = RateKey {
            tenant,
            from,
            to,
            date,
        };
        if let Some(quote) = self.cache.get(&key) {
            debug!(%from, %to, %date, rate = %quote.rate, "Exchange rate served from cache");
            return Ok(RateQuote {
                step: RateStep::Cached,
                ..quote
            });
        }

        let quote = self.resolve_uncached(tx, tenant, from, to, date).await?;
        if quote.step != RateStep::External {
            self.cache.insert(key, quote);
        }
        Ok(quote)
    }

    async fn resolve_uncached<T: LedgerTx>(
        &self,
        tx: &mut T,
        tenant: TenantId,
        from: Currency,
        to: Currency,
        date: NaiveDate,
    ) -> Result<RateQuote, CurrencyError> {
        let direct = tx.rates(tenant, from, to, date).await?;
        if let Some(rate) = pick_stored_rate(&direct, date) {
            debug!(%from, %to, %date, rate = %rate.rate, "Exchange rate resolved from stored rate");
            return Ok(quote(rate, RateStep::Stored));
        }

        let reverse = tx.rates(tenant, to, from, date).await?;
        if let Some(rate) = pick_stored_rate(&reverse, date) {
            let inverted = rate.inverse();
            debug!(
                %from, %to, %date, rate = %inverted.rate,
                "Exchange rate resolved from inverse rate"
            );
            return Ok(quote(&inverted, RateStep::Inverse));
        }

        let not_found = || CurrencyError::RateNotFound { from, to, date };
        let Some(source) = &self.source else {
            return Err(not_found());
        };

        let rates = match tokio::time::timeout(self.timeout, source.latest_rates(from)).await {
            Ok(Ok(rates)) => rates,
            Ok(Err(e)) => {
                warn!(%from, %to, %date, error = %e, "External rate source failed");
                return Err(not_found());
            }
            Err(_) => {
                warn!(
                    %from, %to, %date, timeout_ms = self.timeout.as_millis(),
                    "External rate source timed out"
                );
                return Err(not_found());
            }
        };

        let rate = rates
            .get(&to)
            .copied()
            .filter(|r| r.is_sign_positive() && !r.is_zero())
            .ok_or_else(not_found)?;

        let fetched = ExchangeRate::new(None, from, to, rate, date, RateSource::Api);
        tx.insert_rate(&fetched).await?;
        debug!(%from, %to, %date, %rate, "Exchange rate fetched and persisted");

        Ok(quote(&fetched, RateStep::External))
    }
}

fn quote(rate: &ExchangeRate, step: RateStep) -> RateQuote {
    RateQuote {
        from: rate.from_currency,
        to: rate.to_currency,
        rate: rate.rate,
        step,
        source: rate.source,
        effective_date: rate.effective_date,
    }
}
