pub mod traits;

// API provider implementations
pub mod exchange_rate_api;
