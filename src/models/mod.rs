//! Data models representing database entities.
//!
//! Each module holds the sqlx row type for one table plus the request and
//! response bodies of its endpoints.

/// Bank accounts
pub mod bank_account;
/// Cash boxes and cash movements
pub mod cash_box;
/// Collections (receivables) and their payments
pub mod collection;
/// Payment-term installment templates
pub mod payment_term;
/// Rubros (invoice categories)
pub mod rubro;
/// Support tickets
pub mod support;
/// Users, companies and sessions
pub mod user;

use crate::error::AppError;

/// Currency used when a request omits one.
pub(crate) fn default_currency() -> String {
    "ARS".to_string()
}

/// ISO 4217 style code: exactly three upper-case ASCII letters.
///
/// Payments only move between records with byte-equal currencies, so every
/// entity that carries one goes through this check.
pub(crate) fn validate_currency(currency: &str) -> Result<(), AppError> {
    if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AppError::InvalidRequest(
            "Currency must be a 3-letter ISO code".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_must_be_three_upper_case_letters() {
        assert!(validate_currency("ARS").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("€").is_err());
        assert!(validate_currency("US").is_err());
        assert!(validate_currency("USDT").is_err());
    }
}
