use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::money::normalize_currency;

use super::traits::RateProvider;

const BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// ExchangeRate-API provider for fiat exchange rates.
///
/// - **Endpoint**: `GET /v6/{api_key}/latest/{base}`
/// - **Response**: `{ "result": "success", "conversion_rates": { "EUR": 0.92, ... } }`
///   or `{ "result": "error", "error-type": "unsupported-code" }`
/// - One call returns the full rate table for a base currency, so callers
///   cache the table rather than individual pairs.
pub struct ExchangeRateApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ExchangeRateApiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the provider at a different endpoint (self-hosted mirror, test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

// ── ExchangeRate-API response types ─────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        "ExchangeRate-API"
    }

    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        let from = normalize_currency(from)?;
        let to = normalize_currency(to)?;

        // Same currency → rate is 1.0
        if from == to {
            return Ok(1.0);
        }

        let rates = self.get_all_rates(&from).await?;
        rates
            .get(&to)
            .copied()
            .ok_or_else(|| CoreError::RateUnavailable {
                from,
                to,
                reason: "target currency not in provider response".into(),
            })
    }

    async fn get_all_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        let base = normalize_currency(base)?;
        let url = format!("{}/{}/latest/{base}", self.base_url, self.api_key);

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: "ExchangeRate-API".into(),
                message: format!("Failed to parse rate table for {base}: {e}"),
            })?;

        if resp.result != "success" {
            return Err(CoreError::Api {
                provider: "ExchangeRate-API".into(),
                message: resp
                    .error_type
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        if resp.conversion_rates.is_empty() {
            return Err(CoreError::Api {
                provider: "ExchangeRate-API".into(),
                message: format!("Empty rate table for {base}"),
            });
        }

        Ok(resp.conversion_rates)
    }
}
