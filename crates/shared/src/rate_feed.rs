//! HTTP client for the external exchange-rate feed.
//!
//! The feed answers `GET {base_url}/latest?base=USD` with
//! `{"base": "USD", "rates": {"EUR": 0.92, ...}}`.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::config::RatesConfig;
use crate::error::{AppError, AppResult};
use crate::types::Currency;

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
}

/// Client for the latest-rates endpoint of an exchange-rate feed.
#[derive(Debug, Clone)]
pub struct RateFeedClient {
    client: Client,
    base_url: String,
}

impl RateFeedClient {
    /// Creates a client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client from configuration, or `None` when no feed is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &RatesConfig) -> AppResult<Option<Self>> {
        config
            .feed_base_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_millis(config.feed_timeout_ms)))
            .transpose()
    }

    /// Fetches the latest rates quoted against `base`.
    ///
    /// # Errors
    ///
    /// Returns `ExternalService` on transport failures, non-success status
    /// codes, or malformed bodies.
    pub async fn latest_rates(&self, base: Currency) -> AppResult<HashMap<Currency, Decimal>> {
        let url = format!("{}/latest", self.base_url);
        debug!(%base, %url, "Fetching latest exchange rates");

        let response = self
            .client
            .get(&url)
            .query(&[("base", base.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("rate feed request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "rate feed returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::ExternalService(format!("rate feed body unreadable: {e}")))?;

        parse_latest_rates(&body)
    }
}

/// Parses a latest-rates body.
///
/// Unknown currency codes and non-positive or non-numeric rates are skipped.
///
/// # Errors
///
/// Returns `ExternalService` if the body is not valid JSON.
pub fn parse_latest_rates(body: &str) -> AppResult<HashMap<Currency, Decimal>> {
    let parsed: LatestRatesResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalService(format!("rate feed body malformed: {e}")))?;

    let rates = parsed
        .rates
        .into_iter()
        .filter_map(|(code, value)| {
            let currency = Currency::from_str(&code).ok()?;
            let rate = decimal_from_json(&value)?;
            (rate > Decimal::ZERO).then_some((currency, rate))
        })
        .collect();

    Ok(rates)
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
