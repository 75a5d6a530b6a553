use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::CoreError;

/// Trait abstraction for exchange-rate providers.
///
/// The live HTTP provider implements this, and so do the mocks in the test
/// suite. If the upstream API changes or dies, only one implementation is
/// replaced; the reconciler and rate service are untouched.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// The multiplicative rate from one currency to another:
    /// `amount_in_to = amount_in_from * rate`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError>;

    /// Every known rate for a base currency, keyed by target currency code.
    async fn get_all_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError>;
}
