use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monthly spending cap for one category.
///
/// At most one budget exists per (user, category, budget_month, budget_year).
/// `total_spent` is a derived aggregate: the sum of the amounts of all
/// expenses currently linked to this budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,

    pub user_id: Uuid,

    pub category: String,

    /// The spending cap for the month.
    pub monthly_budget: f64,

    /// Derived aggregate: sum of linked expenses' amounts, in `currency`.
    pub total_spent: f64,

    /// 3-letter uppercase currency code.
    pub currency: String,

    /// 1–12.
    pub budget_month: u32,

    pub budget_year: i32,

    /// Snapshot fields, mirroring the income/expense pattern. Set once by
    /// the reconciler, never overwritten.
    #[serde(default)]
    pub original_monthly_budget: Option<f64>,

    #[serde(default)]
    pub original_total_spent: Option<f64>,

    #[serde(default)]
    pub original_currency: Option<String>,
}

impl Budget {
    pub fn new(
        user_id: Uuid,
        category: impl Into<String>,
        monthly_budget: f64,
        currency: impl Into<String>,
        budget_month: u32,
        budget_year: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category: category.into(),
            monthly_budget,
            total_spent: 0.0,
            currency: currency.into(),
            budget_month,
            budget_year,
            original_monthly_budget: None,
            original_total_spent: None,
            original_currency: None,
        }
    }
}

/// Patch payload for budget updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub category: Option<String>,
    pub monthly_budget: Option<f64>,
    pub currency: Option<String>,
    pub budget_month: Option<u32>,
    pub budget_year: Option<i32>,
}
