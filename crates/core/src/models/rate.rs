use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// How long a fetched rate table stays fresh before a new lookup is required.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
struct CachedRates {
    rates: HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
}

/// In-memory cache of exchange-rate tables, keyed by base currency.
///
/// Providers return a full table per base currency, so one fetch serves every
/// target. Entries expire after [`FRESHNESS_WINDOW_MINUTES`]; expired entries
/// are simply ignored on lookup and replaced on the next insert.
#[derive(Debug, Clone, Default)]
pub struct RateCache {
    entries: HashMap<String, CachedRates>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_entry(&self, base: &str, now: DateTime<Utc>) -> Option<&CachedRates> {
        self.entries.get(base).filter(|cached| {
            now - cached.fetched_at < Duration::minutes(FRESHNESS_WINDOW_MINUTES)
        })
    }

    /// A single cached rate, if the table for `base` is still fresh.
    pub fn get(&self, base: &str, target: &str, now: DateTime<Utc>) -> Option<f64> {
        self.fresh_entry(base, now)
            .and_then(|cached| cached.rates.get(target).copied())
    }

    /// The whole cached table for `base`, if still fresh.
    pub fn get_all(&self, base: &str, now: DateTime<Utc>) -> Option<&HashMap<String, f64>> {
        self.fresh_entry(base, now).map(|cached| &cached.rates)
    }

    /// Store a freshly fetched rate table, replacing any stale one.
    pub fn insert(&mut self, base: impl Into<String>, rates: HashMap<String, f64>, now: DateTime<Utc>) {
        self.entries.insert(
            base.into(),
            CachedRates {
                rates,
                fetched_at: now,
            },
        );
    }

    pub fn is_fresh(&self, base: &str, now: DateTime<Utc>) -> bool {
        self.fresh_entry(base, now).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
