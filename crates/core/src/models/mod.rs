pub mod budget;
pub mod expense;
pub mod income;
pub mod ledger;
pub mod money;
pub mod rate;
pub mod savings_goal;
pub mod user;
