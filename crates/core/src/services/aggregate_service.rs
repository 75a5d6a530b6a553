use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::expense::{Expense, ExpenseUpdate};
use crate::models::income::{Income, IncomeUpdate};
use crate::models::ledger::Ledger;
use crate::models::money::{normalize_currency, validate_amount};

use super::budget_service::BudgetService;

/// Keeps the derived aggregates consistent across every income/expense
/// mutation: `User.total_savings` (incomes minus expenses) and
/// `Budget.total_spent` (sum of linked expenses).
///
/// Pure business logic over the ledger, no I/O. Callers get all-or-nothing
/// semantics by running these methods against a working copy of the ledger
/// and committing by swap.
pub struct AggregateService;

impl AggregateService {
    pub fn new() -> Self {
        Self
    }

    // ── Incomes ─────────────────────────────────────────────────────

    /// Persist an income and credit the user's savings aggregate.
    pub fn create_income(
        &self,
        ledger: &mut Ledger,
        user_id: Uuid,
        source: impl Into<String>,
        amount: f64,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        validate_amount("income amount", amount)?;
        let currency = normalize_currency(currency)?;

        let user = ledger.user_mut(user_id)?;
        user.total_savings += amount;

        let income = Income::new(user_id, source, amount, currency, date);
        let id = income.id;
        ledger.incomes.insert(id, income);
        Ok(id)
    }

    /// Patch an income, applying the amount delta to the savings aggregate.
    pub fn update_income(
        &self,
        ledger: &mut Ledger,
        income_id: Uuid,
        update: IncomeUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let (old_amount, owner) = {
            let income = ledger
                .incomes
                .get(&income_id)
                .ok_or_else(|| CoreError::NotFound(format!("Income {income_id}")))?;
            (income.amount, income.user_id)
        };
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Income {income_id} does not belong to user {user_id}"
            )));
        }

        if let Some(amount) = update.amount {
            validate_amount("income amount", amount)?;
        }
        let currency = match &update.currency {
            Some(code) => Some(normalize_currency(code)?),
            None => None,
        };

        let delta = update.amount.unwrap_or(old_amount) - old_amount;
        ledger.user_mut(user_id)?.total_savings += delta;

        if let Some(income) = ledger.incomes.get_mut(&income_id) {
            if let Some(source) = update.source {
                income.source = source;
            }
            if let Some(amount) = update.amount {
                income.amount = amount;
            }
            if let Some(code) = currency {
                income.currency = code;
            }
            if let Some(date) = update.date {
                income.date = date;
            }
        }
        Ok(())
    }

    /// Remove an income, undoing exactly the credit it applied at creation.
    pub fn delete_income(
        &self,
        ledger: &mut Ledger,
        income_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let (amount, owner) = {
            let income = ledger
                .incomes
                .get(&income_id)
                .ok_or_else(|| CoreError::NotFound(format!("Income {income_id}")))?;
            (income.amount, income.user_id)
        };
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Income {income_id} does not belong to user {user_id}"
            )));
        }

        ledger.user_mut(user_id)?.total_savings -= amount;
        ledger.incomes.remove(&income_id);
        Ok(())
    }

    // ── Expenses ────────────────────────────────────────────────────

    /// Persist an expense, link it to its budget (creating one with the
    /// heuristic default cap when none exists), and debit the user's
    /// savings aggregate.
    #[allow(clippy::too_many_arguments)]
    pub fn create_expense(
        &self,
        ledger: &mut Ledger,
        linker: &BudgetService,
        user_id: Uuid,
        subject: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        validate_amount("expense amount", amount)?;
        let currency = normalize_currency(currency)?;
        ledger.user(user_id)?;

        let mut expense = Expense::new(user_id, subject, category, amount, currency.clone(), date);
        let (month, year) = expense.period();

        let budget_id = linker.resolve_or_create(
            ledger,
            user_id,
            &expense.category,
            month,
            year,
            &currency,
            amount,
        );
        if let Some(budget) = ledger.budgets.get_mut(&budget_id) {
            budget.total_spent += amount;
        }
        expense.budget_id = Some(budget_id);

        if let Ok(user) = ledger.user_mut(user_id) {
            user.total_savings -= amount;
        }

        let id = expense.id;
        ledger.expenses.insert(id, expense);
        Ok(id)
    }

    /// Patch an expense. Amount deltas flow into the savings aggregate and
    /// the linked budget; a category or period change moves the expense to
    /// the budget matching its new (category, month, year), creating one
    /// when none exists.
    pub fn update_expense(
        &self,
        ledger: &mut Ledger,
        linker: &BudgetService,
        expense_id: Uuid,
        update: ExpenseUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let (old_amount, old_category, old_period, old_budget, owner) = {
            let expense = ledger
                .expenses
                .get(&expense_id)
                .ok_or_else(|| CoreError::NotFound(format!("Expense {expense_id}")))?;
            (
                expense.amount,
                expense.category.clone(),
                expense.period(),
                expense.budget_id,
                expense.user_id,
            )
        };
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Expense {expense_id} does not belong to user {user_id}"
            )));
        }

        if let Some(amount) = update.amount {
            validate_amount("expense amount", amount)?;
        }
        let currency = match &update.currency {
            Some(code) => Some(normalize_currency(code)?),
            None => None,
        };

        let new_amount = update.amount.unwrap_or(old_amount);
        let new_category = update.category.clone().unwrap_or_else(|| old_category.clone());
        let new_date = update.date;
        let new_period = new_date
            .map(|d| (chrono::Datelike::month(&d), chrono::Datelike::year(&d)))
            .unwrap_or(old_period);

        let new_currency = currency.clone().unwrap_or_else(|| {
            // The stored currency is already normalized.
            ledger
                .expenses
                .get(&expense_id)
                .map(|e| e.currency.clone())
                .unwrap_or_default()
        });

        let relocated = new_category != old_category || new_period != old_period;

        if relocated {
            // Detach from the old budget, then resolve (or create) the one
            // matching the new category/period.
            if let Some(old_id) = old_budget {
                if let Some(budget) = ledger.budgets.get_mut(&old_id) {
                    budget.total_spent -= old_amount;
                }
            }
            let new_budget_id = linker.resolve_or_create(
                ledger,
                user_id,
                &new_category,
                new_period.0,
                new_period.1,
                &new_currency,
                new_amount,
            );
            if let Some(budget) = ledger.budgets.get_mut(&new_budget_id) {
                budget.total_spent += new_amount;
            }
            if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
                expense.budget_id = Some(new_budget_id);
            }
        } else if let Some(budget_id) = old_budget {
            // Same budget, amount may have moved.
            if let Some(budget) = ledger.budgets.get_mut(&budget_id) {
                budget.total_spent += new_amount - old_amount;
            }
        }

        // More spent means less saved.
        ledger.user_mut(user_id)?.total_savings -= new_amount - old_amount;

        if let Some(expense) = ledger.expenses.get_mut(&expense_id) {
            if let Some(subject) = update.subject {
                expense.subject = subject;
            }
            expense.category = new_category;
            expense.amount = new_amount;
            if let Some(code) = currency {
                expense.currency = code;
            }
            if let Some(date) = new_date {
                expense.date = date;
            }
        }
        Ok(())
    }

    /// Remove an expense, undoing exactly the debit it applied at creation
    /// and releasing it from its budget.
    pub fn delete_expense(
        &self,
        ledger: &mut Ledger,
        expense_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let (amount, budget_id, owner) = {
            let expense = ledger
                .expenses
                .get(&expense_id)
                .ok_or_else(|| CoreError::NotFound(format!("Expense {expense_id}")))?;
            (expense.amount, expense.budget_id, expense.user_id)
        };
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Expense {expense_id} does not belong to user {user_id}"
            )));
        }

        if let Some(budget_id) = budget_id {
            if let Some(budget) = ledger.budgets.get_mut(&budget_id) {
                budget.total_spent -= amount;
            }
        }
        ledger.user_mut(user_id)?.total_savings += amount;
        ledger.expenses.remove(&expense_id);
        Ok(())
    }
}

impl Default for AggregateService {
    fn default() -> Self {
        Self::new()
    }
}
