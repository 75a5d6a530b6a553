use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A savings target the user is working towards.
///
/// `current_amount` is edited directly by the user; it does not feed the
/// savings aggregate. Goals are still swept by the currency reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: Uuid,

    pub user_id: Uuid,

    pub name: String,

    /// Always positive.
    pub target_amount: f64,

    /// Non-negative; user-maintained progress towards the target.
    pub current_amount: f64,

    pub target_date: NaiveDate,

    /// 3-letter uppercase currency code.
    pub currency: String,

    /// Snapshot fields, set once by the reconciler, never overwritten.
    #[serde(default)]
    pub original_target_amount: Option<f64>,

    #[serde(default)]
    pub original_current_amount: Option<f64>,

    #[serde(default)]
    pub original_currency: Option<String>,
}

impl SavingsGoal {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        target_amount: f64,
        current_amount: f64,
        target_date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            target_amount,
            current_amount,
            target_date,
            currency: currency.into(),
            original_target_amount: None,
            original_current_amount: None,
            original_currency: None,
        }
    }
}

/// Patch payload for savings goal updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavingsGoalUpdate {
    pub name: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub currency: Option<String>,
}
