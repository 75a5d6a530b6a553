use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::budget::{Budget, BudgetUpdate};
use crate::models::ledger::Ledger;
use crate::models::money::{normalize_currency, validate_amount};

/// Default cap applied when an expense lands in a category with no budget
/// yet: the first expense's amount times this multiplier.
pub const DEFAULT_CAP_MULTIPLIER: f64 = 2.0;

/// Resolves which budget an expense belongs to and keeps the
/// (user, category, month, year) uniqueness invariant enforced.
///
/// Pure business logic over the ledger, no I/O.
pub struct BudgetService;

impl BudgetService {
    pub fn new() -> Self {
        Self
    }

    // ── Linking ─────────────────────────────────────────────────────

    /// Find the unique budget for (user, category, month, year), creating
    /// one with the default heuristic cap when none exists.
    ///
    /// The created budget starts with `total_spent = 0`; the caller applies
    /// the triggering expense's amount, so found and created budgets are
    /// handled identically.
    pub fn resolve_or_create(
        &self,
        ledger: &mut Ledger,
        user_id: Uuid,
        category: &str,
        month: u32,
        year: i32,
        currency: &str,
        expense_amount: f64,
    ) -> Uuid {
        if let Some(budget) = ledger.budget_for_period(user_id, category, month, year) {
            return budget.id;
        }

        let budget = Budget::new(
            user_id,
            category,
            expense_amount * DEFAULT_CAP_MULTIPLIER,
            currency,
            month,
            year,
        );
        let id = budget.id;
        ledger.budgets.insert(id, budget);
        id
    }

    /// Move an expense between budgets (or detach it with `None`), adjusting
    /// `total_spent` on both sides. No budget is auto-created here: a relink
    /// to "no budget" is an intentional detach.
    pub fn relink(
        &self,
        ledger: &mut Ledger,
        expense_id: Uuid,
        new_budget: Option<Uuid>,
    ) -> Result<(), CoreError> {
        let (amount, old_budget) = {
            let expense = ledger
                .expenses
                .get(&expense_id)
                .ok_or_else(|| CoreError::NotFound(format!("Expense {expense_id}")))?;
            (expense.amount, expense.budget_id)
        };

        if old_budget == new_budget {
            return Ok(());
        }

        // Validate the target before detaching from the old budget.
        if let Some(new_id) = new_budget {
            if !ledger.budgets.contains_key(&new_id) {
                return Err(CoreError::NotFound(format!("Budget {new_id}")));
            }
        }

        if let Some(old_id) = old_budget {
            if let Some(budget) = ledger.budgets.get_mut(&old_id) {
                budget.total_spent -= amount;
            }
        }
        if let Some(new_id) = new_budget {
            if let Some(budget) = ledger.budgets.get_mut(&new_id) {
                budget.total_spent += amount;
            }
        }
        if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
            expense.budget_id = new_budget;
        }

        Ok(())
    }

    // ── Direct CRUD ─────────────────────────────────────────────────

    /// Create a budget explicitly. Month 0 defaults to the current calendar
    /// month/year; year 0 to the current year. Fails with `Conflict` if a
    /// budget already exists for the same (user, category, month, year).
    ///
    /// Existing expenses in that category/period that aren't linked anywhere
    /// are adopted, and their amounts summed into `total_spent`.
    pub fn create_budget(
        &self,
        ledger: &mut Ledger,
        user_id: Uuid,
        category: impl Into<String>,
        monthly_budget: f64,
        currency: &str,
        month: u32,
        year: i32,
    ) -> Result<Uuid, CoreError> {
        ledger.user(user_id)?;
        validate_amount("monthly budget", monthly_budget)?;
        let currency = normalize_currency(currency)?;
        let category = category.into();
        let (month, year) = Self::default_period(month, year)?;

        if ledger.budget_for_period(user_id, &category, month, year).is_some() {
            return Err(CoreError::Conflict(format!(
                "A budget for category '{category}' already exists for {month}/{year}"
            )));
        }

        let mut budget = Budget::new(user_id, category.clone(), monthly_budget, currency, month, year);
        let id = budget.id;

        // Adopt unlinked expenses already recorded for this category/period.
        let matching: Vec<Uuid> = ledger
            .expenses
            .values()
            .filter(|e| {
                e.user_id == user_id
                    && e.category == category
                    && e.budget_id.is_none()
                    && e.period() == (month, year)
            })
            .map(|e| e.id)
            .collect();

        let mut total_spent = 0.0;
        for expense_id in matching {
            if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
                expense.budget_id = Some(id);
                total_spent += expense.amount;
            }
        }
        budget.total_spent = total_spent;

        ledger.budgets.insert(id, budget);
        Ok(id)
    }

    /// Patch a budget. If the (category, month, year) tuple changes, linked
    /// expenses are released and the expenses matching the new tuple adopted,
    /// recomputing `total_spent`; otherwise `total_spent` is preserved.
    pub fn update_budget(
        &self,
        ledger: &mut Ledger,
        budget_id: Uuid,
        update: BudgetUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let existing = ledger
            .budgets
            .get(&budget_id)
            .ok_or_else(|| CoreError::NotFound(format!("Budget {budget_id}")))?;
        if existing.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Budget {budget_id} does not belong to user {user_id}"
            )));
        }

        if let Some(amount) = update.monthly_budget {
            validate_amount("monthly budget", amount)?;
        }
        let currency = match &update.currency {
            Some(code) => Some(normalize_currency(code)?),
            None => None,
        };
        if let Some(month) = update.budget_month {
            if !(1..=12).contains(&month) {
                return Err(CoreError::InvalidArgument(format!(
                    "Budget month must be 1-12, got {month}"
                )));
            }
        }

        let new_category = update.category.clone().unwrap_or_else(|| existing.category.clone());
        let new_month = update.budget_month.unwrap_or(existing.budget_month);
        let new_year = update.budget_year.unwrap_or(existing.budget_year);
        let tuple_changed = new_category != existing.category
            || new_month != existing.budget_month
            || new_year != existing.budget_year;

        if tuple_changed {
            if let Some(conflicting) =
                ledger.budget_for_period(user_id, &new_category, new_month, new_year)
            {
                if conflicting.id != budget_id {
                    return Err(CoreError::Conflict(format!(
                        "A budget for category '{new_category}' already exists for {new_month}/{new_year}"
                    )));
                }
            }
        }

        if let Some(budget) = ledger.budgets.get_mut(&budget_id) {
            if let Some(category) = update.category {
                budget.category = category;
            }
            if let Some(amount) = update.monthly_budget {
                budget.monthly_budget = amount;
            }
            if let Some(code) = currency {
                budget.currency = code;
            }
            budget.budget_month = new_month;
            budget.budget_year = new_year;
        }

        if tuple_changed {
            self.recompute_links(ledger, budget_id, user_id)?;
        }

        Ok(())
    }

    /// Delete a budget. Its expenses survive, detached.
    pub fn delete_budget(
        &self,
        ledger: &mut Ledger,
        budget_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let budget = ledger
            .budgets
            .get(&budget_id)
            .ok_or_else(|| CoreError::NotFound(format!("Budget {budget_id}")))?;
        if budget.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Budget {budget_id} does not belong to user {user_id}"
            )));
        }

        let linked: Vec<Uuid> = ledger
            .expenses
            .values()
            .filter(|e| e.budget_id == Some(budget_id))
            .map(|e| e.id)
            .collect();
        for expense_id in linked {
            if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
                expense.budget_id = None;
            }
        }

        ledger.budgets.remove(&budget_id);
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────

    /// Release every expense linked to this budget, then adopt the expenses
    /// matching its current (category, month, year) and recompute
    /// `total_spent` from them.
    fn recompute_links(
        &self,
        ledger: &mut Ledger,
        budget_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let (category, month, year) = {
            let budget = ledger
                .budgets
                .get(&budget_id)
                .ok_or_else(|| CoreError::NotFound(format!("Budget {budget_id}")))?;
            (budget.category.clone(), budget.budget_month, budget.budget_year)
        };

        let previously_linked: Vec<Uuid> = ledger
            .expenses
            .values()
            .filter(|e| e.budget_id == Some(budget_id))
            .map(|e| e.id)
            .collect();
        for expense_id in previously_linked {
            if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
                expense.budget_id = None;
            }
        }

        let matching: Vec<Uuid> = ledger
            .expenses
            .values()
            .filter(|e| {
                e.user_id == user_id
                    && e.category == category
                    && e.budget_id.is_none()
                    && e.period() == (month, year)
            })
            .map(|e| e.id)
            .collect();

        let mut total_spent = 0.0;
        for expense_id in matching {
            if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
                expense.budget_id = Some(budget_id);
                total_spent += expense.amount;
            }
        }

        if let Some(budget) = ledger.budgets.get_mut(&budget_id) {
            budget.total_spent = total_spent;
        }
        Ok(())
    }

    /// Resolve month/year defaults: month 0 means "now", year 0 means the
    /// current year. Anything else outside 1-12 is rejected.
    fn default_period(month: u32, year: i32) -> Result<(u32, i32), CoreError> {
        let today = Utc::now().date_naive();
        let (month, year) = match (month, year) {
            (0, _) => (today.month(), today.year()),
            (m, 0) => (m, today.year()),
            (m, y) => (m, y),
        };
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidArgument(format!(
                "Budget month must be 1-12, got {month}"
            )));
        }
        Ok((month, year))
    }
}

impl Default for BudgetService {
    fn default() -> Self {
        Self::new()
    }
}
