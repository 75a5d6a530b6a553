// ═══════════════════════════════════════════════════════════════════
// Reconciliation Tests — bulk currency conversion, snapshot round-trips,
// the savings recompute, and all-or-nothing failure behavior
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

use finance_tracker_core::errors::CoreError;
use finance_tracker_core::models::money::round_money;
use finance_tracker_core::providers::traits::RateProvider;
use finance_tracker_core::FinanceTracker;

// ═══════════════════════════════════════════════════════════════════
// Mock Providers
// ═══════════════════════════════════════════════════════════════════

/// Fixed rate tables. Multipliers are chosen to be exact in binary where the
/// test asserts exact values.
struct MockRateProvider {
    tables: HashMap<String, HashMap<String, f64>>,
}

impl MockRateProvider {
    fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "USD".to_string(),
            HashMap::from([("PHP".to_string(), 56.0), ("EUR".to_string(), 0.5)]),
        );
        tables.insert(
            "PHP".to_string(),
            HashMap::from([
                ("USD".to_string(), 1.0 / 56.0),
                ("EUR".to_string(), 0.016),
            ]),
        );
        tables.insert(
            "EUR".to_string(),
            HashMap::from([("PHP".to_string(), 60.0), ("USD".to_string(), 2.0)]),
        );
        Self { tables }
    }

    fn with_tables(tables: HashMap<String, HashMap<String, f64>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        "MockRateProvider"
    }

    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        self.get_all_rates(from)
            .await?
            .get(to)
            .copied()
            .ok_or_else(|| CoreError::RateUnavailable {
                from: from.into(),
                to: to.into(),
                reason: "pair not in mock tables".into(),
            })
    }

    async fn get_all_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        self.tables
            .get(base)
            .cloned()
            .ok_or_else(|| CoreError::RateUnavailable {
                from: base.into(),
                to: "*".into(),
                reason: "base not in mock tables".into(),
            })
    }
}

struct FailingProvider;

#[async_trait]
impl RateProvider for FailingProvider {
    fn name(&self) -> &str {
        "FailingProvider"
    }

    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, CoreError> {
        Err(CoreError::RateUnavailable {
            from: from.into(),
            to: to.into(),
            reason: "provider down".into(),
        })
    }

    async fn get_all_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        Err(CoreError::RateUnavailable {
            from: base.into(),
            to: "*".into(),
            reason: "provider down".into(),
        })
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A user with 1000 USD income and a 300 USD Food expense: savings 700,
/// one auto-created budget with a 600 cap.
fn setup(provider: Box<dyn RateProvider>) -> (FinanceTracker, Uuid) {
    let mut tracker = FinanceTracker::with_ledger(Default::default(), provider);
    let user_id = tracker
        .register_user("Alice", "alice@example.com", "USD")
        .unwrap();
    tracker
        .add_income(user_id, "Salary", 1000.0, "USD", date(2026, 3, 1))
        .unwrap();
    tracker
        .add_expense(user_id, "Groceries", "Food", 300.0, "USD", date(2026, 3, 10))
        .unwrap();
    (tracker, user_id)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ═══════════════════════════════════════════════════════════════════
// Conversion sweep
// ═══════════════════════════════════════════════════════════════════

mod conversion {
    use super::*;

    #[tokio::test]
    async fn converts_every_record_and_recomputes_savings() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .add_goal(user_id, "Vacation", 5000.0, 1200.0, date(2026, 12, 1), "USD")
            .unwrap();

        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();

        let user = tracker.get_user(user_id).unwrap();
        assert_eq!(user.currency, "PHP");
        // Recomputed: 1000*56 − 300*56.
        assert_close(user.total_savings, 39200.0);

        let income = tracker.get_incomes(user_id)[0];
        assert_eq!(income.currency, "PHP");
        assert_close(income.amount, 56000.0);

        let expense = tracker.get_expenses(user_id)[0];
        assert_eq!(expense.currency, "PHP");
        assert_close(expense.amount, 16800.0);

        let budget = tracker.get_budgets(user_id)[0];
        assert_eq!(budget.currency, "PHP");
        assert_close(budget.monthly_budget, 33600.0);
        assert_close(budget.total_spent, 16800.0);

        let goal = tracker.get_goals(user_id)[0];
        assert_eq!(goal.currency, "PHP");
        assert_close(goal.target_amount, 280000.0);
        assert_close(goal.current_amount, 67200.0);
    }

    #[tokio::test]
    async fn snapshots_are_taken_on_first_conversion() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();

        let income = tracker.get_incomes(user_id)[0];
        assert_eq!(income.original_currency.as_deref(), Some("USD"));
        assert_close(income.original_amount.unwrap(), 1000.0);

        let expense = tracker.get_expenses(user_id)[0];
        assert_eq!(expense.original_currency.as_deref(), Some("USD"));
        assert_close(expense.original_amount.unwrap(), 300.0);

        let budget = tracker.get_budgets(user_id)[0];
        assert_eq!(budget.original_currency.as_deref(), Some("USD"));
        assert_close(budget.original_monthly_budget.unwrap(), 600.0);
        assert_close(budget.original_total_spent.unwrap(), 300.0);

        let user = tracker.get_user(user_id).unwrap();
        assert_eq!(user.original_currency.as_deref(), Some("USD"));
        assert_close(user.original_total_savings.unwrap(), 700.0);
    }

    #[tokio::test]
    async fn snapshots_survive_later_conversions() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();
        tracker
            .convert_user_currency(user_id, "PHP", "EUR")
            .await
            .unwrap();

        // Still the first-ever snapshot, not PHP.
        let income = tracker.get_incomes(user_id)[0];
        assert_eq!(income.currency, "EUR");
        assert_eq!(income.original_currency.as_deref(), Some("USD"));
        assert_close(income.original_amount.unwrap(), 1000.0);
    }

    #[tokio::test]
    async fn converted_amounts_are_rounded_to_cents() {
        let mut tracker = FinanceTracker::new(Box::new(MockRateProvider::with_tables(
            HashMap::from([(
                "USD".to_string(),
                HashMap::from([("EUR".to_string(), 0.333)]),
            )]),
        )));
        let user_id = tracker
            .register_user("Alice", "alice@example.com", "USD")
            .unwrap();
        tracker
            .add_income(user_id, "Salary", 10.0, "USD", date(2026, 3, 1))
            .unwrap();

        tracker
            .convert_user_currency(user_id, "USD", "EUR")
            .await
            .unwrap();

        // 10 * 0.333 = 3.33, not 3.3300000000000005 or similar.
        assert_close(tracker.get_incomes(user_id)[0].amount, 3.33);
        assert_close(tracker.get_user(user_id).unwrap().total_savings, 3.33);
    }

    #[tokio::test]
    async fn converting_to_the_same_currency_is_rejected() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        let result = tracker.convert_user_currency(user_id, "USD", "usd").await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn converting_an_unknown_user_is_not_found() {
        let mut tracker = FinanceTracker::new(Box::new(MockRateProvider::new()));
        let result = tracker
            .convert_user_currency(Uuid::new_v4(), "USD", "PHP")
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn other_users_records_are_untouched() {
        let (mut tracker, alice) = setup(Box::new(MockRateProvider::new()));
        let bob = tracker
            .register_user("Bob", "bob@example.com", "USD")
            .unwrap();
        tracker
            .add_income(bob, "Salary", 500.0, "USD", date(2026, 3, 1))
            .unwrap();

        tracker
            .convert_user_currency(alice, "USD", "PHP")
            .await
            .unwrap();

        let bob_income = tracker.get_incomes(bob)[0];
        assert_eq!(bob_income.currency, "USD");
        assert_close(bob_income.amount, 500.0);
        assert_eq!(tracker.get_user(bob).unwrap().currency, "USD");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Round trips
// ═══════════════════════════════════════════════════════════════════

mod round_trips {
    use super::*;

    #[tokio::test]
    async fn back_conversion_restores_original_amounts_exactly() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .add_goal(user_id, "Vacation", 5000.0, 1200.0, date(2026, 12, 1), "USD")
            .unwrap();

        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();
        tracker
            .convert_user_currency(user_id, "PHP", "USD")
            .await
            .unwrap();

        // Bit-for-bit restoration from the snapshots, not 1000*56/56.
        let income = tracker.get_incomes(user_id)[0];
        assert_eq!(income.amount, 1000.0);
        assert_eq!(income.currency, "USD");

        let expense = tracker.get_expenses(user_id)[0];
        assert_eq!(expense.amount, 300.0);

        let budget = tracker.get_budgets(user_id)[0];
        assert_eq!(budget.monthly_budget, 600.0);
        assert_eq!(budget.total_spent, 300.0);

        let goal = tracker.get_goals(user_id)[0];
        assert_eq!(goal.target_amount, 5000.0);
        assert_eq!(goal.current_amount, 1200.0);

        // Aggregate recomputed over the restored amounts.
        let user = tracker.get_user(user_id).unwrap();
        assert_eq!(user.currency, "USD");
        assert_close(user.total_savings, 700.0);
    }

    #[tokio::test]
    async fn a_third_currency_multiplies_instead_of_restoring() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .convert_user_currency(user_id, "USD", "EUR")
            .await
            .unwrap();

        // EUR is not the snapshot currency, so this is a plain multiply.
        let income = tracker.get_incomes(user_id)[0];
        assert_eq!(income.currency, "EUR");
        assert_close(income.amount, 500.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Mixed-currency ledgers
// ═══════════════════════════════════════════════════════════════════

mod mixed_currencies {
    use super::*;

    #[tokio::test]
    async fn records_in_other_currencies_are_skipped() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        let eur_income = tracker
            .add_income(user_id, "Freelance", 100.0, "EUR", date(2026, 3, 15))
            .unwrap();

        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();

        let income = tracker.get_income(eur_income, user_id).unwrap();
        assert_eq!(income.currency, "EUR");
        assert_close(income.amount, 100.0);
        assert!(income.original_currency.is_none());
    }

    #[tokio::test]
    async fn savings_recompute_prices_skipped_records_at_their_own_rate() {
        let (mut tracker, user_id) = setup(Box::new(MockRateProvider::new()));
        tracker
            .add_income(user_id, "Freelance", 100.0, "EUR", date(2026, 3, 15))
            .unwrap();

        tracker
            .convert_user_currency(user_id, "USD", "PHP")
            .await
            .unwrap();

        // 1000*56 − 300*56 + 100*60 (EUR→PHP), not the old sum times the rate.
        let user = tracker.get_user(user_id).unwrap();
        assert_close(user.total_savings, 45200.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Failure atomicity
// ═══════════════════════════════════════════════════════════════════

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn a_failed_rate_lookup_changes_nothing() {
        let (mut tracker, user_id) = setup(Box::new(FailingProvider));
        let before = tracker.to_json().unwrap();

        let result = tracker.convert_user_currency(user_id, "USD", "PHP").await;
        assert!(matches!(result, Err(CoreError::RateUnavailable { .. })));

        assert_eq!(tracker.to_json().unwrap(), before);
        let user = tracker.get_user(user_id).unwrap();
        assert_eq!(user.currency, "USD");
        assert!(user.original_currency.is_none());
    }

    #[tokio::test]
    async fn a_missing_residual_rate_aborts_the_whole_sweep() {
        // USD→PHP is available, but the EUR income can't be priced into PHP.
        let provider = MockRateProvider::with_tables(HashMap::from([(
            "USD".to_string(),
            HashMap::from([("PHP".to_string(), 56.0)]),
        )]));
        let (mut tracker, user_id) = setup(Box::new(provider));
        tracker
            .add_income(user_id, "Freelance", 100.0, "EUR", date(2026, 3, 15))
            .unwrap();
        let before = tracker.to_json().unwrap();

        let result = tracker.convert_user_currency(user_id, "USD", "PHP").await;
        assert!(matches!(result, Err(CoreError::RateUnavailable { .. })));

        // Even the USD records that would have converted are untouched.
        assert_eq!(tracker.to_json().unwrap(), before);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Monetary rounding
// ═══════════════════════════════════════════════════════════════════

mod rounding {
    use super::*;

    #[test]
    fn rounds_to_two_decimal_places() {
        assert_eq!(round_money(1.234), 1.23);
        assert_eq!(round_money(1.236), 1.24);
        assert_eq!(round_money(100.0), 100.0);
    }

    #[test]
    fn midpoints_round_half_to_even() {
        // Exact binary midpoints, so the tie-breaking rule is actually hit.
        assert_eq!(round_money(0.125), 0.12);
        assert_eq!(round_money(0.375), 0.38);
        assert_eq!(round_money(10.625), 10.62);
        assert_eq!(round_money(2.875), 2.88);
        assert_eq!(round_money(-0.125), -0.12);
    }

    #[test]
    fn already_rounded_values_pass_through() {
        assert_eq!(round_money(42.42), 42.42);
        assert_eq!(round_money(0.0), 0.0);
    }
}
