pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use chrono::NaiveDate;
use uuid::Uuid;

use models::{
    budget::{Budget, BudgetUpdate},
    expense::{Expense, ExpenseUpdate},
    income::{Income, IncomeUpdate},
    ledger::Ledger,
    money::normalize_currency,
    savings_goal::{SavingsGoal, SavingsGoalUpdate},
    user::{User, UserUpdate},
};
use providers::traits::RateProvider;
use services::{
    aggregate_service::AggregateService, budget_service::BudgetService,
    goal_service::GoalService, rate_service::RateService,
    reconcile_service::ReconcileService,
};

use errors::CoreError;

/// Main entry point for the finance tracker core library.
/// Holds the ledger state and all services needed to operate on it.
///
/// Every mutation runs against a working copy of the ledger and commits by
/// swap, so a failure partway through a multi-entity operation (expense
/// creation that also touches a budget and the savings aggregate, or a full
/// currency reconciliation) leaves no observable change.
#[must_use]
pub struct FinanceTracker {
    ledger: Ledger,
    aggregate_service: AggregateService,
    budget_service: BudgetService,
    goal_service: GoalService,
    reconcile_service: ReconcileService,
    rate_service: RateService,
    /// Tracks whether any mutation has occurred since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for FinanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceTracker")
            .field("users", &self.ledger.users.len())
            .field("incomes", &self.ledger.incomes.len())
            .field("expenses", &self.ledger.expenses.len())
            .field("budgets", &self.ledger.budgets.len())
            .field("savings_goals", &self.ledger.savings_goals.len())
            .field("cached_rate_bases", &self.rate_service.cached_bases())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl FinanceTracker {
    /// Create a tracker with an empty ledger.
    pub fn new(provider: Box<dyn RateProvider>) -> Self {
        Self::build(Ledger::new(), provider)
    }

    /// Create a tracker over an existing ledger (e.g. deserialized from disk).
    pub fn with_ledger(ledger: Ledger, provider: Box<dyn RateProvider>) -> Self {
        Self::build(ledger, provider)
    }

    /// Load a ledger from its JSON representation.
    pub fn from_json(json: &str, provider: Box<dyn RateProvider>) -> Result<Self, CoreError> {
        let ledger: Ledger = serde_json::from_str(json)?;
        Ok(Self::build(ledger, provider))
    }

    // ── Users ───────────────────────────────────────────────────────

    /// Register a new user. Email addresses are unique across the ledger.
    pub fn register_user(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        currency: &str,
    ) -> Result<Uuid, CoreError> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidArgument("User name must not be empty".into()));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid email address '{email}'"
            )));
        }
        let currency = normalize_currency(currency)?;
        if self.ledger.find_user_by_email(&email).is_some() {
            return Err(CoreError::Conflict(format!(
                "A user with email '{email}' already exists"
            )));
        }

        let user = User::new(name, email, currency);
        let id = user.id;
        self.ledger.users.insert(id, user);
        self.dirty = true;
        Ok(id)
    }

    /// Patch a user's profile. Changing `currency` here only relabels the
    /// display currency; use [`convert_user_currency`](Self::convert_user_currency)
    /// to convert the ledger's amounts.
    pub fn update_user(&mut self, user_id: Uuid, update: UserUpdate) -> Result<(), CoreError> {
        self.ledger.user(user_id)?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidArgument("User name must not be empty".into()));
            }
        }
        if let Some(email) = &update.email {
            if email.trim().is_empty() || !email.contains('@') {
                return Err(CoreError::InvalidArgument(format!(
                    "Invalid email address '{email}'"
                )));
            }
            if let Some(existing) = self.ledger.find_user_by_email(email) {
                if existing.id != user_id {
                    return Err(CoreError::Conflict(format!(
                        "A user with email '{email}' already exists"
                    )));
                }
            }
        }
        let currency = match &update.currency {
            Some(code) => Some(normalize_currency(code)?),
            None => None,
        };

        let user = self.ledger.user_mut(user_id)?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(code) = currency {
            user.currency = code;
        }
        self.dirty = true;
        Ok(())
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: Uuid) -> Result<&User, CoreError> {
        self.ledger.user(user_id)
    }

    /// Look up a user by email.
    #[must_use]
    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.ledger.find_user_by_email(email)
    }

    // ── Incomes ─────────────────────────────────────────────────────

    /// Record an income; the user's savings aggregate is credited.
    pub fn add_income(
        &mut self,
        user_id: Uuid,
        source: impl Into<String>,
        amount: f64,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        let mut working = self.ledger.clone();
        let id = self
            .aggregate_service
            .create_income(&mut working, user_id, source, amount, currency, date)?;
        self.ledger = working;
        self.dirty = true;
        Ok(id)
    }

    /// Patch an income owned by `user_id`.
    pub fn update_income(
        &mut self,
        income_id: Uuid,
        update: IncomeUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.aggregate_service
            .update_income(&mut working, income_id, update, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Delete an income owned by `user_id`, undoing its savings credit.
    pub fn delete_income(&mut self, income_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.aggregate_service
            .delete_income(&mut working, income_id, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Get a single income, enforcing ownership.
    pub fn get_income(&self, income_id: Uuid, user_id: Uuid) -> Result<&Income, CoreError> {
        let income = self
            .ledger
            .incomes
            .get(&income_id)
            .ok_or_else(|| CoreError::NotFound(format!("Income {income_id}")))?;
        if income.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Income {income_id} does not belong to user {user_id}"
            )));
        }
        Ok(income)
    }

    /// All incomes for a user, oldest first.
    #[must_use]
    pub fn get_incomes(&self, user_id: Uuid) -> Vec<&Income> {
        self.ledger.incomes_for_user(user_id)
    }

    /// Incomes within a date range (inclusive), oldest first.
    #[must_use]
    pub fn get_incomes_in_range(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<&Income> {
        self.ledger.incomes_in_range(user_id, from, to)
    }

    // ── Expenses ────────────────────────────────────────────────────

    /// Record an expense. It is linked to the budget matching its
    /// (category, month, year), created with a heuristic default cap when
    /// none exists, and the user's savings aggregate is debited.
    pub fn add_expense(
        &mut self,
        user_id: Uuid,
        subject: impl Into<String>,
        category: impl Into<String>,
        amount: f64,
        currency: &str,
        date: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        let mut working = self.ledger.clone();
        let id = self.aggregate_service.create_expense(
            &mut working,
            &self.budget_service,
            user_id,
            subject,
            category,
            amount,
            currency,
            date,
        )?;
        self.ledger = working;
        self.dirty = true;
        Ok(id)
    }

    /// Patch an expense owned by `user_id`. Amount deltas flow into the
    /// savings aggregate and the linked budget; category or date changes
    /// move the expense to the budget matching its new period.
    pub fn update_expense(
        &mut self,
        expense_id: Uuid,
        update: ExpenseUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.aggregate_service.update_expense(
            &mut working,
            &self.budget_service,
            expense_id,
            update,
            user_id,
        )?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Delete an expense owned by `user_id`, undoing its savings debit and
    /// releasing it from its budget.
    pub fn delete_expense(&mut self, expense_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.aggregate_service
            .delete_expense(&mut working, expense_id, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Get a single expense, enforcing ownership.
    pub fn get_expense(&self, expense_id: Uuid, user_id: Uuid) -> Result<&Expense, CoreError> {
        let expense = self
            .ledger
            .expenses
            .get(&expense_id)
            .ok_or_else(|| CoreError::NotFound(format!("Expense {expense_id}")))?;
        if expense.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Expense {expense_id} does not belong to user {user_id}"
            )));
        }
        Ok(expense)
    }

    /// All expenses for a user, oldest first.
    #[must_use]
    pub fn get_expenses(&self, user_id: Uuid) -> Vec<&Expense> {
        self.ledger.expenses_for_user(user_id)
    }

    /// Expenses in a category, oldest first.
    #[must_use]
    pub fn get_expenses_for_category(&self, user_id: Uuid, category: &str) -> Vec<&Expense> {
        self.ledger.expenses_for_category(user_id, category)
    }

    /// Expenses within a date range (inclusive), oldest first.
    #[must_use]
    pub fn get_expenses_in_range(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<&Expense> {
        self.ledger.expenses_in_range(user_id, from, to)
    }

    // ── Budgets ─────────────────────────────────────────────────────

    /// Create a budget explicitly. Month 0 defaults to the current calendar
    /// month and year; fails with `Conflict` if a budget already exists for
    /// the same (category, month, year). Unlinked expenses matching the
    /// category and period are adopted.
    pub fn create_budget(
        &mut self,
        user_id: Uuid,
        category: impl Into<String>,
        monthly_budget: f64,
        currency: &str,
        month: u32,
        year: i32,
    ) -> Result<Uuid, CoreError> {
        let mut working = self.ledger.clone();
        let id = self.budget_service.create_budget(
            &mut working,
            user_id,
            category,
            monthly_budget,
            currency,
            month,
            year,
        )?;
        self.ledger = working;
        self.dirty = true;
        Ok(id)
    }

    /// Patch a budget owned by `user_id`. Changing the (category, month,
    /// year) tuple relinks expenses and recomputes `total_spent`.
    pub fn update_budget(
        &mut self,
        budget_id: Uuid,
        update: BudgetUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.budget_service
            .update_budget(&mut working, budget_id, update, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Delete a budget owned by `user_id`. Its expenses survive, detached.
    pub fn delete_budget(&mut self, budget_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.budget_service
            .delete_budget(&mut working, budget_id, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Move an expense to another budget, or detach it with `None`.
    /// `total_spent` is adjusted on both sides.
    pub fn relink_expense(
        &mut self,
        expense_id: Uuid,
        new_budget: Option<Uuid>,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        self.get_expense(expense_id, user_id)?;
        if let Some(budget_id) = new_budget {
            let budget = self
                .ledger
                .budgets
                .get(&budget_id)
                .ok_or_else(|| CoreError::NotFound(format!("Budget {budget_id}")))?;
            if budget.user_id != user_id {
                return Err(CoreError::PermissionDenied(format!(
                    "Budget {budget_id} does not belong to user {user_id}"
                )));
            }
        }

        let mut working = self.ledger.clone();
        self.budget_service
            .relink(&mut working, expense_id, new_budget)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Get a single budget, enforcing ownership.
    pub fn get_budget(&self, budget_id: Uuid, user_id: Uuid) -> Result<&Budget, CoreError> {
        let budget = self
            .ledger
            .budgets
            .get(&budget_id)
            .ok_or_else(|| CoreError::NotFound(format!("Budget {budget_id}")))?;
        if budget.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Budget {budget_id} does not belong to user {user_id}"
            )));
        }
        Ok(budget)
    }

    /// All budgets for a user, ordered by (year, month, category).
    #[must_use]
    pub fn get_budgets(&self, user_id: Uuid) -> Vec<&Budget> {
        self.ledger.budgets_for_user(user_id)
    }

    /// Budgets for one calendar month, ordered by category.
    #[must_use]
    pub fn get_budgets_for_month(&self, user_id: Uuid, month: u32, year: i32) -> Vec<&Budget> {
        self.ledger.budgets_for_month(user_id, month, year)
    }

    /// Expenses currently linked to a budget, oldest first.
    #[must_use]
    pub fn get_linked_expenses(&self, budget_id: Uuid) -> Vec<&Expense> {
        self.ledger.expenses_linked_to(budget_id)
    }

    // ── Savings goals ───────────────────────────────────────────────

    pub fn add_goal(
        &mut self,
        user_id: Uuid,
        name: impl Into<String>,
        target_amount: f64,
        current_amount: f64,
        target_date: NaiveDate,
        currency: &str,
    ) -> Result<Uuid, CoreError> {
        let mut working = self.ledger.clone();
        let id = self.goal_service.create_goal(
            &mut working,
            user_id,
            name,
            target_amount,
            current_amount,
            target_date,
            currency,
        )?;
        self.ledger = working;
        self.dirty = true;
        Ok(id)
    }

    pub fn update_goal(
        &mut self,
        goal_id: Uuid,
        update: SavingsGoalUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.goal_service
            .update_goal(&mut working, goal_id, update, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    pub fn delete_goal(&mut self, goal_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.goal_service
            .delete_goal(&mut working, goal_id, user_id)?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// Get a single savings goal, enforcing ownership.
    pub fn get_goal(&self, goal_id: Uuid, user_id: Uuid) -> Result<&SavingsGoal, CoreError> {
        let goal = self
            .ledger
            .savings_goals
            .get(&goal_id)
            .ok_or_else(|| CoreError::NotFound(format!("Savings goal {goal_id}")))?;
        if goal.user_id != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Savings goal {goal_id} does not belong to user {user_id}"
            )));
        }
        Ok(goal)
    }

    /// All savings goals for a user, ordered by target date.
    #[must_use]
    pub fn get_goals(&self, user_id: Uuid) -> Vec<&SavingsGoal> {
        self.ledger.goals_for_user(user_id)
    }

    // ── Currency reconciliation ─────────────────────────────────────

    /// Convert every record of a user from one currency to another and
    /// recompute their savings aggregate in the target currency.
    ///
    /// The sweep runs against a working copy of the ledger; a rate failure
    /// at any point aborts with zero state change. Converting a record back
    /// to the currency it was first recorded in restores its original amount
    /// exactly.
    pub async fn convert_user_currency(
        &mut self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<(), CoreError> {
        let mut working = self.ledger.clone();
        self.reconcile_service
            .convert_user_currency(&mut working, &mut self.rate_service, user_id, from, to)
            .await?;
        self.ledger = working;
        self.dirty = true;
        Ok(())
    }

    /// The current exchange rate between two currencies (cached for an hour
    /// per base currency).
    pub async fn get_exchange_rate(&mut self, from: &str, to: &str) -> Result<f64, CoreError> {
        self.rate_service.get_rate(from, to).await
    }

    // ── Rate cache ──────────────────────────────────────────────────

    /// Number of base currencies with a cached rate table.
    #[must_use]
    pub fn cached_rate_bases(&self) -> usize {
        self.rate_service.cached_bases()
    }

    /// Drop every cached rate table; the next lookup hits the provider.
    pub fn clear_rate_cache(&mut self) {
        self.rate_service.clear_cache();
    }

    // ── Export & dirty state ────────────────────────────────────────

    /// Export the full ledger as JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))
    }

    /// Returns `true` if the ledger has been modified since the last
    /// save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Clear the unsaved-changes flag after the caller persists the ledger.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Read-only view of the full ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(ledger: Ledger, provider: Box<dyn RateProvider>) -> Self {
        Self {
            ledger,
            aggregate_service: AggregateService::new(),
            budget_service: BudgetService::new(),
            goal_service: GoalService::new(),
            reconcile_service: ReconcileService::new(),
            rate_service: RateService::new(provider),
            dirty: false,
        }
    }
}
