use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single income record, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,

    pub user_id: Uuid,

    /// Where the money came from (salary, freelance, ...).
    pub source: String,

    /// Always positive.
    pub amount: f64,

    /// 3-letter uppercase currency code.
    pub currency: String,

    pub date: NaiveDate,

    /// Snapshot of the amount in the currency it was first reconciled from.
    /// Set once by the reconciler, never overwritten (supports exact
    /// round-trip restoration instead of compounding multiplication).
    #[serde(default)]
    pub original_amount: Option<f64>,

    #[serde(default)]
    pub original_currency: Option<String>,
}

impl Income {
    pub fn new(
        user_id: Uuid,
        source: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            source: source.into(),
            amount,
            currency: currency.into(),
            date,
            original_amount: None,
            original_currency: None,
        }
    }
}

/// Patch payload for income updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomeUpdate {
    pub source: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<NaiveDate>,
}
