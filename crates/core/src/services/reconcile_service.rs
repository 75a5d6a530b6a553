use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::money::{normalize_currency, round_money};

use super::rate_service::RateService;

/// Bulk, per-user currency conversion of the whole financial record.
///
/// Two things distinguish this from naive "multiply everything by the rate":
///
/// 1. Snapshot restoration: the first time a record is converted out of a
///    currency, its pre-conversion amount is snapshotted. Converting back to
///    that currency later restores the snapshot verbatim instead of
///    multiplying, so a round trip through another currency is exact, with
///    no compounding floating-point drift.
/// 2. Aggregate recompute: the user's `total_savings` is not rescaled by
///    the rate; it is recomputed from first principles as the sum of
///    converted incomes minus converted expenses, rounded once.
///
/// Records whose current currency differs from `from` are skipped, not
/// rewritten, so a ledger that was mixed-currency before a conversion stays
/// mixed after it. The recompute step still prices every record into the
/// target currency for the aggregate, so `total_savings` is correct either
/// way.
///
/// Callers run the sweep against a working copy of the ledger and commit by
/// swap, so any failure (rate lookup included) leaves zero observable change.
pub struct ReconcileService;

impl ReconcileService {
    pub fn new() -> Self {
        Self
    }

    pub async fn convert_user_currency(
        &self,
        ledger: &mut Ledger,
        rates: &mut RateService,
        user_id: Uuid,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<(), CoreError> {
        let from = normalize_currency(from_currency)?;
        let to = normalize_currency(to_currency)?;
        if from == to {
            return Err(CoreError::InvalidArgument(format!(
                "Cannot convert {from} to itself"
            )));
        }
        ledger.user(user_id)?;

        info!(%user_id, %from, %to, "starting currency reconciliation");

        // Phase 1: snapshot original amounts (idempotent; already
        // snapshotted records are left untouched).
        self.snapshot(ledger, user_id, &from);

        // Phase 2: obtain the rate. Fails before any conversion is applied.
        let rate = rates.get_rate(&from, &to).await?;
        debug!(%from, %to, rate, "applying conversion rate");

        // Phase 3: convert every record still denominated in `from`.
        let converted = self.convert_records(ledger, user_id, &from, &to, rate);

        // Phase 4: recompute the savings aggregate from first principles.
        let residual = self.residual_rates(ledger, rates, user_id, &to).await?;
        let mut total = 0.0;
        for income in ledger.incomes.values().filter(|i| i.user_id == user_id) {
            total += Self::in_target(income.amount, &income.currency, &to, &residual)?;
        }
        for expense in ledger.expenses.values().filter(|e| e.user_id == user_id) {
            total -= Self::in_target(expense.amount, &expense.currency, &to, &residual)?;
        }

        let user = ledger.user_mut(user_id)?;
        user.total_savings = round_money(total);
        user.currency = to.clone();

        info!(
            %user_id,
            incomes = converted.0,
            expenses = converted.1,
            budgets = converted.2,
            goals = converted.3,
            total_savings = user.total_savings,
            "currency reconciliation complete"
        );
        Ok(())
    }

    // ── Phase 1: snapshot ───────────────────────────────────────────

    /// Record the pre-conversion amount and currency of every record of this
    /// user still denominated in `from`, unless already recorded. The
    /// snapshot is what makes later back-conversions exact.
    fn snapshot(&self, ledger: &mut Ledger, user_id: Uuid, from: &str) {
        for income in ledger
            .incomes
            .values_mut()
            .filter(|i| i.user_id == user_id && i.currency == from)
        {
            if income.original_currency.is_none() {
                income.original_amount = Some(income.amount);
                income.original_currency = Some(from.to_string());
            }
        }

        for expense in ledger
            .expenses
            .values_mut()
            .filter(|e| e.user_id == user_id && e.currency == from)
        {
            if expense.original_currency.is_none() {
                expense.original_amount = Some(expense.amount);
                expense.original_currency = Some(from.to_string());
            }
        }

        for budget in ledger
            .budgets
            .values_mut()
            .filter(|b| b.user_id == user_id && b.currency == from)
        {
            if budget.original_currency.is_none() {
                budget.original_monthly_budget = Some(budget.monthly_budget);
                budget.original_total_spent = Some(budget.total_spent);
                budget.original_currency = Some(from.to_string());
            }
        }

        for goal in ledger
            .savings_goals
            .values_mut()
            .filter(|g| g.user_id == user_id && g.currency == from)
        {
            if goal.original_currency.is_none() {
                goal.original_target_amount = Some(goal.target_amount);
                goal.original_current_amount = Some(goal.current_amount);
                goal.original_currency = Some(from.to_string());
            }
        }

        if let Ok(user) = ledger.user_mut(user_id) {
            if user.currency == from && user.original_currency.is_none() {
                user.original_total_savings = Some(user.total_savings);
                user.original_currency = Some(from.to_string());
            }
        }
    }

    // ── Phase 3: conversion ─────────────────────────────────────────

    /// Convert every record of this user denominated in `from`. Records
    /// whose snapshot was taken in `to` are restored from the snapshot
    /// instead of multiplied. Returns (incomes, expenses, budgets, goals)
    /// conversion counts.
    fn convert_records(
        &self,
        ledger: &mut Ledger,
        user_id: Uuid,
        from: &str,
        to: &str,
        rate: f64,
    ) -> (usize, usize, usize, usize) {
        let mut counts = (0usize, 0usize, 0usize, 0usize);

        for income in ledger
            .incomes
            .values_mut()
            .filter(|i| i.user_id == user_id && i.currency == from)
        {
            match (income.original_currency.as_deref(), income.original_amount) {
                (Some(original), Some(amount)) if original == to => income.amount = amount,
                _ => income.amount = round_money(income.amount * rate),
            }
            income.currency = to.to_string();
            counts.0 += 1;
        }

        for expense in ledger
            .expenses
            .values_mut()
            .filter(|e| e.user_id == user_id && e.currency == from)
        {
            match (expense.original_currency.as_deref(), expense.original_amount) {
                (Some(original), Some(amount)) if original == to => expense.amount = amount,
                _ => expense.amount = round_money(expense.amount * rate),
            }
            expense.currency = to.to_string();
            counts.1 += 1;
        }

        for budget in ledger
            .budgets
            .values_mut()
            .filter(|b| b.user_id == user_id && b.currency == from)
        {
            if budget.original_currency.as_deref() == Some(to) {
                if let (Some(cap), Some(spent)) =
                    (budget.original_monthly_budget, budget.original_total_spent)
                {
                    budget.monthly_budget = cap;
                    budget.total_spent = spent;
                } else {
                    budget.monthly_budget = round_money(budget.monthly_budget * rate);
                    budget.total_spent = round_money(budget.total_spent * rate);
                }
            } else {
                budget.monthly_budget = round_money(budget.monthly_budget * rate);
                budget.total_spent = round_money(budget.total_spent * rate);
            }
            budget.currency = to.to_string();
            counts.2 += 1;
        }

        for goal in ledger
            .savings_goals
            .values_mut()
            .filter(|g| g.user_id == user_id && g.currency == from)
        {
            if goal.original_currency.as_deref() == Some(to) {
                if let (Some(target), Some(current)) =
                    (goal.original_target_amount, goal.original_current_amount)
                {
                    goal.target_amount = target;
                    goal.current_amount = current;
                } else {
                    goal.target_amount = round_money(goal.target_amount * rate);
                    goal.current_amount = round_money(goal.current_amount * rate);
                }
            } else {
                goal.target_amount = round_money(goal.target_amount * rate);
                goal.current_amount = round_money(goal.current_amount * rate);
            }
            goal.currency = to.to_string();
            counts.3 += 1;
        }

        counts
    }

    // ── Phase 4 helpers ─────────────────────────────────────────────

    /// Rates for pricing leftover (unconverted) currencies into the target.
    /// After phase 3, the user's records are normally all in `to`; only a
    /// ledger that was mixed-currency to begin with needs extra lookups.
    async fn residual_rates(
        &self,
        ledger: &Ledger,
        rates: &mut RateService,
        user_id: Uuid,
        to: &str,
    ) -> Result<HashMap<String, f64>, CoreError> {
        let mut currencies: HashSet<String> = HashSet::new();
        for income in ledger.incomes.values().filter(|i| i.user_id == user_id) {
            if income.currency != to {
                currencies.insert(income.currency.clone());
            }
        }
        for expense in ledger.expenses.values().filter(|e| e.user_id == user_id) {
            if expense.currency != to {
                currencies.insert(expense.currency.clone());
            }
        }

        let mut residual = HashMap::new();
        for currency in currencies {
            let rate = rates.get_rate(&currency, to).await?;
            residual.insert(currency, rate);
        }
        Ok(residual)
    }

    /// Price an amount into the target currency for the aggregate sum.
    /// Individual contributions stay unrounded; the final sum is rounded once.
    fn in_target(
        amount: f64,
        currency: &str,
        to: &str,
        residual: &HashMap<String, f64>,
    ) -> Result<f64, CoreError> {
        if currency == to {
            return Ok(amount);
        }
        residual
            .get(currency)
            .map(|rate| amount * rate)
            .ok_or_else(|| CoreError::RateUnavailable {
                from: currency.to_string(),
                to: to.to_string(),
                reason: "no rate available for residual currency".into(),
            })
    }
}

impl Default for ReconcileService {
    fn default() -> Self {
        Self::new()
    }
}
