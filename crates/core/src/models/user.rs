use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account holder. `total_savings` is a derived aggregate: the sum of all
/// incomes minus the sum of all expenses, expressed in `currency`. It is
/// maintained incrementally by every income/expense mutation and recomputed
/// from scratch by the currency reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    pub email: String,

    /// Current display currency (3-letter uppercase code).
    pub currency: String,

    /// Derived aggregate, denominated in `currency`.
    pub total_savings: f64,

    /// The first currency this user's ledger was ever reconciled from.
    /// Populated once by the reconciler's snapshot step, never overwritten.
    #[serde(default)]
    pub original_currency: Option<String>,

    /// The savings figure at snapshot time, in `original_currency`.
    #[serde(default)]
    pub original_total_savings: Option<f64>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            currency: currency.into(),
            total_savings: 0.0,
            original_currency: None,
            original_total_savings: None,
        }
    }
}

/// Patch payload for profile updates. `None` fields are left untouched.
/// Changing `currency` here only relabels the display currency; converting
/// the ledger's amounts is the reconciler's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
}
