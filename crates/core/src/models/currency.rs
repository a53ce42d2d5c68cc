use serde::Serialize;

use crate::errors::CoreError;

/// Display metadata for a supported currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    /// ISO 4217 code (e.g., "INR")
    pub code: &'static str,
    /// Symbol shown next to amounts (e.g., "₹")
    pub symbol: &'static str,
    /// Human-readable name (e.g., "Indian Rupee")
    pub name: &'static str,
    /// Locale used to format amounts in this currency
    pub locale: &'static str,
    /// Region to adopt when the visitor picks this currency, if any
    pub home_region: Option<&'static str>,
}

/// Validate a currency code: exactly 3 ASCII letters, returned uppercase.
pub fn normalize_currency_code(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::InvalidCurrency(code.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}
