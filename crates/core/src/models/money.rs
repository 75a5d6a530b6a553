use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::CoreError;

/// Round a monetary value to exactly two decimal places using
/// round-half-to-even ("banker's rounding").
///
/// Rounding happens on the decimal representation of the value, not on the
/// binary float, so repeated conversions don't pick up a systematic bias.
/// Every converted monetary write in the reconciler passes through here.
pub fn round_money(value: f64) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Normalize a currency code: trimmed, uppercased, exactly 3 ASCII letters
/// (e.g., "USD", "EUR", "PHP").
pub fn normalize_currency(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::InvalidArgument(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., USD, EUR, PHP)"
        )));
    }
    Ok(trimmed)
}

/// A monetary amount entering the ledger must be finite and strictly positive.
pub fn validate_amount(label: &str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::InvalidArgument(format!(
            "{label} must be a positive amount, got {value}"
        )));
    }
    Ok(())
}

/// Same as [`validate_amount`] but zero is allowed (e.g., a savings goal
/// that hasn't been funded yet).
pub fn validate_non_negative(label: &str, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::InvalidArgument(format!(
            "{label} must be a non-negative amount, got {value}"
        )));
    }
    Ok(())
}
