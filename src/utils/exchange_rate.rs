use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::Currency;

/// Yen per US dollar when no rate has ever been fetched.
pub const FALLBACK_USD_TO_JPY: f64 = 145.0;

const REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default)]
struct ExchangeRateCache {
    rate: Option<f64>,
    last_updated: Option<DateTime<Utc>>,
}

/// Converts listing prices into the display currency.
///
/// Rates are cached for an hour. A failed refresh falls back to the last
/// cached rate, then to [`FALLBACK_USD_TO_JPY`].
pub struct ExchangeRateClient {
    api_url: String,
    cache_ttl: Duration,
    cache: Mutex<ExchangeRateCache>,
}

impl ExchangeRateClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            cache_ttl: Duration::hours(1),
            cache: Mutex::new(ExchangeRateCache::default()),
        }
    }

    pub async fn convert(
        &self,
        client: &Client,
        amount: f64,
        source: Currency,
        target: Currency,
    ) -> f64 {
        match (source, target) {
            (Currency::Usd, Currency::Jpy) => amount * self.usd_to_jpy_rate(client).await,
            (Currency::Jpy, Currency::Usd) => amount / self.usd_to_jpy_rate(client).await,
            _ => amount,
        }
    }

    pub async fn usd_to_jpy_rate(&self, client: &Client) -> f64 {
        let mut cache = self.cache.lock().await;

        if let (Some(rate), Some(last_updated)) = (cache.rate, cache.last_updated) {
            if Utc::now() - last_updated < self.cache_ttl {
                return rate;
            }
        }

        match self.fetch_rate(client).await {
            Ok(rate) => {
                info!("Updated USD to JPY exchange rate: {}", rate);
                cache.rate = Some(rate);
                cache.last_updated = Some(Utc::now());
                rate
            }
            Err(e) => {
                let rate = match cache.rate {
                    Some(rate) => {
                        warn!("Exchange rate fetch failed, using cached rate {}: {:#}", rate, e);
                        rate
                    }
                    None => {
                        warn!(
                            "Exchange rate fetch failed, using default rate {}: {:#}",
                            FALLBACK_USD_TO_JPY, e
                        );
                        FALLBACK_USD_TO_JPY
                    }
                };
                // Next attempt waits a full TTL as well
                cache.rate = Some(rate);
                cache.last_updated = Some(Utc::now());
                rate
            }
        }
    }

    async fn fetch_rate(&self, client: &Client) -> Result<f64> {
        let response = client
            .get(&self.api_url)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .context("Failed to reach exchange rate API")?
            .error_for_status()?;

        let data: serde_json::Value = response.json().await?;
        let rate = data["rates"]["JPY"]
            .as_f64()
            .context("Response is missing rates.JPY")?;

        if rate <= 0.0 {
            anyhow::bail!("Exchange rate API returned non-positive rate {}", rate);
        }
        Ok(rate)
    }
}
