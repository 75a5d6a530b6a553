use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single expense record, owned by exactly one user.
///
/// `budget_id` is a weak link: an expense may be attached to the unique
/// budget matching its (category, month, year). The budget's `total_spent`
/// is derived from its linked expenses, but neither side owns the other in
/// a cascading-delete sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,

    pub user_id: Uuid,

    /// What the money was spent on (free text).
    pub subject: String,

    pub category: String,

    /// Always positive.
    pub amount: f64,

    /// 3-letter uppercase currency code.
    pub currency: String,

    pub date: NaiveDate,

    /// Link to the budget covering this expense's (category, month, year),
    /// if any. Plain id reference, no back-pointer.
    #[serde(default)]
    pub budget_id: Option<Uuid>,

    /// Snapshot of the amount in the currency it was first reconciled from.
    #[serde(default)]
    pub original_amount: Option<f64>,

    #[serde(default)]
    pub original_currency: Option<String>,
}

impl Expense {
    pub fn new(
        user_id: Uuid,
        subject: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            subject: subject.into(),
            category: category.into(),
            amount,
            currency: currency.into(),
            date,
            budget_id: None,
            original_amount: None,
            original_currency: None,
        }
    }

    /// The budget period this expense falls into, derived from its date.
    pub fn period(&self) -> (u32, i32) {
        (self.date.month(), self.date.year())
    }
}

/// Patch payload for expense updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub subject: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<NaiveDate>,
}
