use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::money::{normalize_currency, validate_amount, validate_non_negative};
use crate::models::savings_goal::{SavingsGoal, SavingsGoalUpdate};

/// CRUD for savings goals. Goals don't feed the savings aggregate (the
/// user edits `current_amount` directly) but they are swept by the
/// currency reconciler like everything else.
pub struct GoalService;

impl GoalService {
    pub fn new() -> Self {
        Self
    }

    pub fn create_goal(
        &self,
        ledger: &mut Ledger,
        user_id: Uuid,
        name: impl Into<String>,
        target_amount: f64,
        current_amount: f64,
        target_date: NaiveDate,
        currency: &str,
    ) -> Result<Uuid, CoreError> {
        validate_amount("goal target amount", target_amount)?;
        validate_non_negative("goal current amount", current_amount)?;
        let currency = normalize_currency(currency)?;
        ledger.user(user_id)?;

        let goal = SavingsGoal::new(user_id, name, target_amount, current_amount, target_date, currency);
        let id = goal.id;
        ledger.savings_goals.insert(id, goal);
        Ok(id)
    }

    pub fn update_goal(
        &self,
        ledger: &mut Ledger,
        goal_id: Uuid,
        update: SavingsGoalUpdate,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let owner = ledger
            .savings_goals
            .get(&goal_id)
            .map(|g| g.user_id)
            .ok_or_else(|| CoreError::NotFound(format!("Savings goal {goal_id}")))?;
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Savings goal {goal_id} does not belong to user {user_id}"
            )));
        }

        if let Some(amount) = update.target_amount {
            validate_amount("goal target amount", amount)?;
        }
        if let Some(amount) = update.current_amount {
            validate_non_negative("goal current amount", amount)?;
        }
        let currency = match &update.currency {
            Some(code) => Some(normalize_currency(code)?),
            None => None,
        };

        if let Some(goal) = ledger.savings_goals.get_mut(&goal_id) {
            if let Some(name) = update.name {
                goal.name = name;
            }
            if let Some(amount) = update.target_amount {
                goal.target_amount = amount;
            }
            if let Some(amount) = update.current_amount {
                goal.current_amount = amount;
            }
            if let Some(date) = update.target_date {
                goal.target_date = date;
            }
            if let Some(code) = currency {
                goal.currency = code;
            }
        }
        Ok(())
    }

    pub fn delete_goal(
        &self,
        ledger: &mut Ledger,
        goal_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CoreError> {
        let owner = ledger
            .savings_goals
            .get(&goal_id)
            .map(|g| g.user_id)
            .ok_or_else(|| CoreError::NotFound(format!("Savings goal {goal_id}")))?;
        if owner != user_id {
            return Err(CoreError::PermissionDenied(format!(
                "Savings goal {goal_id} does not belong to user {user_id}"
            )));
        }
        ledger.savings_goals.remove(&goal_id);
        Ok(())
    }
}

impl Default for GoalService {
    fn default() -> Self {
        Self::new()
    }
}
