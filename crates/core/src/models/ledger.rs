use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::CoreError;

use super::budget::Budget;
use super::expense::Expense;
use super::income::Income;
use super::savings_goal::SavingsGoal;
use super::user::User;

/// The main data container: every record the engine operates on, keyed by id.
///
/// The container is `Clone` so that multi-entity operations can run against
/// a working copy and commit by swap: either every write lands or none do.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    pub users: HashMap<Uuid, User>,
    pub incomes: HashMap<Uuid, Income>,
    pub expenses: HashMap<Uuid, Expense>,
    pub budgets: HashMap<Uuid, Budget>,
    pub savings_goals: HashMap<Uuid, SavingsGoal>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Users ───────────────────────────────────────────────────────

    pub fn user(&self, user_id: Uuid) -> Result<&User, CoreError> {
        self.users
            .get(&user_id)
            .ok_or_else(|| CoreError::NotFound(format!("User {user_id}")))
    }

    pub fn user_mut(&mut self, user_id: Uuid) -> Result<&mut User, CoreError> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| CoreError::NotFound(format!("User {user_id}")))
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    // ── Incomes ─────────────────────────────────────────────────────

    /// All incomes for a user, oldest first (ties broken by id for a
    /// deterministic order).
    pub fn incomes_for_user(&self, user_id: Uuid) -> Vec<&Income> {
        let mut incomes: Vec<&Income> = self
            .incomes
            .values()
            .filter(|i| i.user_id == user_id)
            .collect();
        incomes.sort_by_key(|i| (i.date, i.id));
        incomes
    }

    pub fn incomes_in_range(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<&Income> {
        let mut incomes: Vec<&Income> = self
            .incomes
            .values()
            .filter(|i| i.user_id == user_id && i.date >= from && i.date <= to)
            .collect();
        incomes.sort_by_key(|i| (i.date, i.id));
        incomes
    }

    // ── Expenses ────────────────────────────────────────────────────

    /// All expenses for a user, oldest first.
    pub fn expenses_for_user(&self, user_id: Uuid) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self
            .expenses
            .values()
            .filter(|e| e.user_id == user_id)
            .collect();
        expenses.sort_by_key(|e| (e.date, e.id));
        expenses
    }

    pub fn expenses_for_category(&self, user_id: Uuid, category: &str) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self
            .expenses
            .values()
            .filter(|e| e.user_id == user_id && e.category == category)
            .collect();
        expenses.sort_by_key(|e| (e.date, e.id));
        expenses
    }

    pub fn expenses_in_range(&self, user_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self
            .expenses
            .values()
            .filter(|e| e.user_id == user_id && e.date >= from && e.date <= to)
            .collect();
        expenses.sort_by_key(|e| (e.date, e.id));
        expenses
    }

    /// Expenses currently linked to a budget.
    pub fn expenses_linked_to(&self, budget_id: Uuid) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self
            .expenses
            .values()
            .filter(|e| e.budget_id == Some(budget_id))
            .collect();
        expenses.sort_by_key(|e| (e.date, e.id));
        expenses
    }

    // ── Budgets ─────────────────────────────────────────────────────

    /// The unique budget for (user, category, month, year), if one exists.
    pub fn budget_for_period(
        &self,
        user_id: Uuid,
        category: &str,
        month: u32,
        year: i32,
    ) -> Option<&Budget> {
        self.budgets.values().find(|b| {
            b.user_id == user_id
                && b.category == category
                && b.budget_month == month
                && b.budget_year == year
        })
    }

    pub fn budgets_for_user(&self, user_id: Uuid) -> Vec<&Budget> {
        let mut budgets: Vec<&Budget> = self
            .budgets
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        budgets.sort_by(|a, b| {
            (a.budget_year, a.budget_month, &a.category, a.id)
                .cmp(&(b.budget_year, b.budget_month, &b.category, b.id))
        });
        budgets
    }

    pub fn budgets_for_month(&self, user_id: Uuid, month: u32, year: i32) -> Vec<&Budget> {
        let mut budgets: Vec<&Budget> = self
            .budgets
            .values()
            .filter(|b| b.user_id == user_id && b.budget_month == month && b.budget_year == year)
            .collect();
        budgets.sort_by(|a, b| (&a.category, a.id).cmp(&(&b.category, b.id)));
        budgets
    }

    // ── Savings goals ───────────────────────────────────────────────

    pub fn goals_for_user(&self, user_id: Uuid) -> Vec<&SavingsGoal> {
        let mut goals: Vec<&SavingsGoal> = self
            .savings_goals
            .values()
            .filter(|g| g.user_id == user_id)
            .collect();
        goals.sort_by_key(|g| (g.target_date, g.id));
        goals
    }
}
