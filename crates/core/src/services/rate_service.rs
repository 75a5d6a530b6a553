use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::models::money::normalize_currency;
use crate::models::rate::RateCache;
use crate::providers::traits::RateProvider;

/// Fetches exchange rates from a provider with a freshness-windowed cache.
///
/// Cache strategy: providers return a full rate table per base currency, so
/// one fetch serves every (base, target) pair for the next hour. Identical
/// currency pairs short-circuit to 1.0 without touching provider or cache.
///
/// Any provider failure, and any pair the provider doesn't cover, surfaces
/// as `RateUnavailable`; callers treat that as "abort, change nothing".
pub struct RateService {
    provider: Box<dyn RateProvider>,
    cache: RateCache,
}

impl RateService {
    pub fn new(provider: Box<dyn RateProvider>) -> Self {
        Self {
            provider,
            cache: RateCache::new(),
        }
    }

    /// The multiplicative rate from one currency to another.
    ///
    /// 1. Same pair → 1.0.
    /// 2. Fresh cache entry → return it.
    /// 3. Otherwise fetch the full table for `from`, cache it, extract `to`.
    pub async fn get_rate(&mut self, from: &str, to: &str) -> Result<f64, CoreError> {
        let from = normalize_currency(from)?;
        let to = normalize_currency(to)?;

        if from == to {
            return Ok(1.0);
        }

        let now = Utc::now();
        if let Some(rate) = self.cache.get(&from, &to, now) {
            debug!(%from, %to, rate, "using cached exchange rate");
            return Self::validate_rate(&from, &to, rate);
        }

        let rates = self.fetch_table(&from).await?;
        let rate = rates
            .get(&to)
            .copied()
            .ok_or_else(|| CoreError::RateUnavailable {
                from: from.clone(),
                to: to.clone(),
                reason: "currency not supported by provider".into(),
            })?;
        self.cache.insert(from.clone(), rates, now);

        info!(%from, %to, rate, "fetched exchange rate");
        Self::validate_rate(&from, &to, rate)
    }

    /// Every known rate for a base currency (cached with the same window).
    pub async fn get_all_rates(&mut self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        let base = normalize_currency(base)?;
        let now = Utc::now();

        if let Some(rates) = self.cache.get_all(&base, now) {
            debug!(%base, "using cached rate table");
            return Ok(rates.clone());
        }

        let rates = self.fetch_table(&base).await?;
        self.cache.insert(base, rates.clone(), now);
        Ok(rates)
    }

    /// Number of base currencies currently cached.
    pub fn cached_bases(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached rate table; the next lookup hits the provider.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    async fn fetch_table(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        self.provider
            .get_all_rates(base)
            .await
            .map_err(|e| match e {
                unavailable @ CoreError::RateUnavailable { .. } => unavailable,
                other => CoreError::RateUnavailable {
                    from: base.to_string(),
                    to: "*".into(),
                    reason: format!("{} failed: {other}", self.provider.name()),
                },
            })
    }

    fn validate_rate(from: &str, to: &str, rate: f64) -> Result<f64, CoreError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(CoreError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
                reason: format!("provider returned invalid rate {rate}"),
            });
        }
        Ok(rate)
    }
}
