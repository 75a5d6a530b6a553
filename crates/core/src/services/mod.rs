pub mod aggregate_service;
pub mod budget_service;
pub mod goal_service;
pub mod rate_service;
pub mod reconcile_service;
