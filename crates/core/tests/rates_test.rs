//! Exchange rate resolution through the engine: stored, inverse, feed.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{books, books_with, date, invoice};
use folio_core::currency::{CurrencyError, ExchangeRate, ExternalRateSource, RateSource, RateStep};
use folio_core::posting::{BusinessEvent, PostingError};
use folio_shared::types::{AccountId, Currency};
use folio_shared::{AppError, AppResult, FolioConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

// ============================================================================
// Mock feeds
// ============================================================================

#[derive(Debug, Default)]
struct FixedFeed {
    rates: HashMap<Currency, Decimal>,
    calls: AtomicUsize,
}

impl FixedFeed {
    fn quoting(currency: Currency, rate: Decimal) -> Arc<Self> {
        Arc::new(Self {
            rates: HashMap::from([(currency, rate)]),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ExternalRateSource for FixedFeed {
    async fn latest_rates(&self, _base: Currency) -> AppResult<HashMap<Currency, Decimal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rates.clone())
    }
}

#[derive(Debug)]
struct BrokenFeed;

#[async_trait]
impl ExternalRateSource for BrokenFeed {
    async fn latest_rates(&self, _base: Currency) -> AppResult<HashMap<Currency, Decimal>> {
        Err(AppError::ExternalService("upstream returned 503".to_string()))
    }
}

#[derive(Debug)]
struct SlowFeed;

#[async_trait]
impl ExternalRateSource for SlowFeed {
    async fn latest_rates(&self, _base: Currency) -> AppResult<HashMap<Currency, Decimal>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(HashMap::from([(Currency::EUR, dec!(0.9))]))
    }
}

fn is_rate_not_found(err: &PostingError) -> bool {
    matches!(err, PostingError::Currency(CurrencyError::RateNotFound { .. }))
}

// ============================================================================
// Stored rates
// ============================================================================

#[tokio::test]
async fn test_same_currency_needs_no_rate() {
    let books = books(Currency::USD).await;
    let quote = books
        .engine
        .resolve_rate(books.tenant, Currency::USD, Currency::USD, date(3))
        .await
        .unwrap();
    assert_eq!(quote.rate, Decimal::ONE);
    assert_eq!(quote.step, RateStep::SameCurrency);
}

#[tokio::test]
async fn test_inverse_rate_fallback() {
    let books = books(Currency::USD).await;
    books
        .store
        .add_rate(ExchangeRate::new(
            None,
            Currency::EUR,
            Currency::USD,
            dec!(2),
            date(1),
            RateSource::Manual,
        ))
        .await;

    let quote = books
        .engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(quote.rate, dec!(0.5));
    assert_eq!(quote.step, RateStep::Inverse);
}

#[tokio::test]
async fn test_tenant_rate_beats_global_rate() {
    let books = books(Currency::USD).await;
    books
        .store
        .add_rate(ExchangeRate::new(
            None,
            Currency::EUR,
            Currency::USD,
            dec!(1.10),
            date(2),
            RateSource::Api,
        ))
        .await;
    books
        .store
        .add_rate(ExchangeRate::new(
            Some(books.tenant),
            Currency::EUR,
            Currency::USD,
            dec!(1.08),
            date(2),
            RateSource::Manual,
        ))
        .await;

    let quote = books
        .engine
        .resolve_rate(books.tenant, Currency::EUR, Currency::USD, date(3))
        .await
        .unwrap();
    assert_eq!(quote.rate, dec!(1.08));
    assert_eq!(quote.step, RateStep::Stored);
}

#[tokio::test]
async fn test_missing_rate_blocks_posting() {
    let books = books(Currency::USD).await;
    let before = books.store.snapshot().await;

    let err = books
        .engine
        .post(&invoice(Currency::JPY, dec!(1000), dec!(0)), date(3), books.tenant, &books.actor)
        .await
        .unwrap_err();
    assert!(is_rate_not_found(&err));
    assert_eq!(err.http_status_code(), 422);
    assert_eq!(books.store.snapshot().await, before);
}

// ============================================================================
// External feed
// ============================================================================

#[tokio::test]
async fn test_feed_rate_is_persisted_then_cached() {
    let books = books(Currency::USD).await;
    let feed = FixedFeed::quoting(Currency::EUR, dec!(0.92));
    let engine = books.engine.with_rate_source(feed.clone());

    let first = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(first.step, RateStep::External);
    assert_eq!(first.source, RateSource::Api);
    assert_eq!(first.rate, dec!(0.92));

    let stored = books.store.snapshot().await.rates;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tenant_id, None);
    assert_eq!(stored[0].source, RateSource::Api);
    assert_eq!(stored[0].effective_date, date(3));

    // The committed row is read back before anything is cached.
    let second = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(second.step, RateStep::Stored);
    assert_eq!(second.rate, first.rate);

    let third = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(third.step, RateStep::Cached);
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

    engine.rates().invalidate_cache();
    let fourth = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(fourth.step, RateStep::Stored);
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_feed_rate_of_failed_posting_is_not_cached() {
    let books = books(Currency::USD).await;
    let feed = FixedFeed::quoting(Currency::USD, dec!(1.1));
    let engine = books.engine.with_rate_source(feed.clone());

    let payment = BusinessEvent::InvoicePayment {
        id: Uuid::new_v4(),
        invoice_id: Uuid::new_v4(),
        currency: Currency::EUR,
        amount: dec!(100),
        deposit_account_id: Some(AccountId::new()),
    };
    let err = engine
        .post(&payment, date(3), books.tenant, &books.actor)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ACCOUNT_NOT_FOUND");
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    assert!(books.store.snapshot().await.rates.is_empty());

    // The next posting fetches again and persists the rate it books at.
    engine
        .post(&invoice(Currency::EUR, dec!(100), dec!(10)), date(4), books.tenant, &books.actor)
        .await
        .unwrap();
    assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    let stored = books.store.snapshot().await.rates;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].rate, dec!(1.1));

    let quote = engine
        .resolve_rate(books.tenant, Currency::EUR, Currency::USD, date(4))
        .await
        .unwrap();
    assert_eq!(quote.step, RateStep::Stored);
}

#[tokio::test]
async fn test_feed_without_the_pair_is_not_found() {
    let books = books(Currency::USD).await;
    let engine = books.engine.with_rate_source(FixedFeed::quoting(Currency::IDR, dec!(16250)));

    let err = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap_err();
    assert!(is_rate_not_found(&err));
    assert!(books.store.snapshot().await.rates.is_empty());
}

#[tokio::test]
async fn test_feed_failure_is_not_found_and_persists_nothing() {
    let books = books(Currency::USD).await;
    let engine = books.engine.with_rate_source(Arc::new(BrokenFeed));

    let err = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap_err();
    assert!(is_rate_not_found(&err));
    assert!(books.store.snapshot().await.rates.is_empty());
}

#[tokio::test]
async fn test_slow_feed_times_out() {
    let mut config = FolioConfig::default();
    config.rates.feed_timeout_ms = 20;
    let books = books_with(Currency::USD, config).await;
    let engine = books.engine.with_rate_source(Arc::new(SlowFeed));

    let err = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap_err();
    assert!(is_rate_not_found(&err));
    assert!(books.store.snapshot().await.rates.is_empty());
}

#[tokio::test]
async fn test_stored_rate_wins_over_feed() {
    let books = books(Currency::USD).await;
    books
        .store
        .add_rate(ExchangeRate::new(
            None,
            Currency::USD,
            Currency::EUR,
            dec!(0.95),
            date(1),
            RateSource::Manual,
        ))
        .await;
    let feed = FixedFeed::quoting(Currency::EUR, dec!(0.92));
    let engine = books.engine.with_rate_source(feed.clone());

    let quote = engine
        .resolve_rate(books.tenant, Currency::USD, Currency::EUR, date(3))
        .await
        .unwrap();
    assert_eq!(quote.rate, dec!(0.95));
    assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
}
