//! Exchange rate types and stored-rate selection.

use chrono::{DateTime, NaiveDate, Utc};
use folio_shared::types::{Currency, ExchangeRateId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Fetched from the external feed.
    Api,
    /// Entered by a user.
    Manual,
    /// Identity rate between a currency and itself.
    SameCurrency,
}

impl RateSource {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Manual => "manual",
            Self::SameCurrency => "same_currency",
        }
    }

    /// Parses a source from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(Self::Api),
            "manual" => Some(Self::Manual),
            "same_currency" => Some(Self::SameCurrency),
            _ => None,
        }
    }
}

/// Exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Unique identifier.
    pub id: ExchangeRateId,
    /// Owning tenant, `None` for rates shared by all tenants.
    pub tenant_id: Option<TenantId>,
    /// Source currency.
    pub from_currency: Currency,
    /// Target currency.
    pub to_currency: Currency,
    /// Exchange rate (1 from_currency = rate to_currency).
    pub rate: Decimal,
    /// Date this rate is effective from.
    pub effective_date: NaiveDate,
    /// Origin of the rate.
    pub source: RateSource,
    /// Takes precedence over other rates on the same date.
    pub manual_override: bool,
    /// Why the override was entered.
    pub override_reason: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub fn new(
        tenant_id: Option<TenantId>,
        from_currency: Currency,
        to_currency: Currency,
        rate: Decimal,
        effective_date: NaiveDate,
        source: RateSource,
    ) -> Self {
        Self {
            id: ExchangeRateId::new(),
            tenant_id,
            from_currency,
            to_currency,
            rate,
            effective_date,
            source,
            manual_override: false,
            override_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Marks the rate as a manual override.
    #[must_use]
    pub fn with_override(mut self, reason: impl Into<String>) -> Self {
        self.source = RateSource::Manual;
        self.manual_override = true;
        self.override_reason = Some(reason.into());
        self
    }

    /// Returns the inverse rate.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from_currency: self.to_currency,
            to_currency: self.from_currency,
            rate: Decimal::ONE / self.rate,
            ..self.clone()
        }
    }
}

/// Which resolution step produced a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStep {
    /// From and to are equal.
    SameCurrency,
    /// Served from the process-local cache.
    Cached,
    /// Stored rate for the pair.
    Stored,
    /// Stored rate for the reverse pair, inverted.
    Inverse,
    /// Fetched from the external feed.
    External,
}

/// A resolved rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    /// Source currency.
    pub from: Currency,
    /// Target currency.
    pub to: Currency,
    /// 1 `from` = `rate` `to`.
    pub rate: Decimal,
    /// Resolution step.
    pub step: RateStep,
    /// Origin of the underlying rate.
    pub source: RateSource,
    /// Effective date of the underlying rate.
    pub effective_date: NaiveDate,
}

impl RateQuote {
    /// Identity quote.
    #[must_use]
    pub const fn same_currency(currency: Currency, date: NaiveDate) -> Self {
        Self {
            from: currency,
            to: currency,
            rate: Decimal::ONE,
            step: RateStep::SameCurrency,
            source: RateSource::SameCurrency,
            effective_date: date,
        }
    }
}

/// Picks the applicable stored rate for `date` among candidate rows.
///
/// Candidates must already be restricted to one currency pair and to the
/// tenant's own rows plus global rows. Selection order:
/// 1. a manual override effective exactly on `date`
/// 2. the most recent effective date on or before `date`
/// 3. tenant rows before global rows, then overrides, then the latest insert
#[must_use]
pub fn pick_stored_rate(candidates: &[ExchangeRate], date: NaiveDate) -> Option<&ExchangeRate> {
    candidates
        .iter()
        .filter(|r| r.effective_date <= date && r.rate > Decimal::ZERO)
        .max_by_key(|r| {
            (
                r.manual_override && r.effective_date == date,
                r.effective_date,
                r.tenant_id.is_some(),
                r.manual_override,
                r.created_at,
            )
        })
}
