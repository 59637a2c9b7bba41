//! Bank account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{default_currency, validate_currency};
use crate::{domain::listing::SortSpec, error::AppError};

/// Represents a bank account record from the database.
///
/// The balance is informational: it is credited when a collection payment
/// is deposited into this account and may go negative (overdraft).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankAccount {
    pub id: Uuid,
    pub bank_name: String,
    pub account_number: String,

    /// "CHECKING" or "SAVINGS"
    pub account_type: String,

    /// Argentine uniform bank code (22 digits)
    pub cbu: Option<String>,
    pub alias: Option<String>,
    pub currency: String,
    pub balance_cents: i64,

    /// Soft-delete flag
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const BANK_ACCOUNT_SORT: SortSpec = SortSpec {
    columns: &[
        ("bank_name", "bank_name"),
        ("balance", "balance_cents"),
        ("created_at", "created_at"),
    ],
    default_key: "bank_name",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
        }
    }
}

/// Extra filters for the bank account list.
#[derive(Debug, Default, Deserialize)]
pub struct BankAccountFilters {
    /// Include soft-deleted accounts (default false)
    #[serde(default)]
    pub include_inactive: bool,
}

/// Body for creating a bank account.
///
/// ```json
/// {
///   "bank_name": "Banco Nación",
///   "account_number": "123-456789/0",
///   "account_type": "CHECKING",
///   "cbu": "0110599520000001234567",
///   "alias": "OBRA.NORTE.PESOS",
///   "currency": "ARS",
///   "opening_balance_cents": 0
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBankAccountRequest {
    pub bank_name: String,
    pub account_number: String,
    #[serde(default = "default_account_type")]
    pub account_type: AccountType,
    pub cbu: Option<String>,
    pub alias: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

impl CreateBankAccountRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_fields(&self.bank_name, &self.account_number, self.cbu.as_deref())?;
        validate_currency(&self.currency)
    }
}

/// Body for updating a bank account. Balance and currency are not editable.
#[derive(Debug, Deserialize)]
pub struct UpdateBankAccountRequest {
    pub bank_name: String,
    pub account_number: String,
    pub account_type: AccountType,
    pub cbu: Option<String>,
    pub alias: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl UpdateBankAccountRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_fields(&self.bank_name, &self.account_number, self.cbu.as_deref())
    }
}

fn default_account_type() -> AccountType {
    AccountType::Checking
}

fn default_active() -> bool {
    true
}

fn validate_fields(bank_name: &str, account_number: &str, cbu: Option<&str>) -> Result<(), AppError> {
    if bank_name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Bank name is required".to_string()));
    }
    if account_number.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Account number is required".to_string(),
        ));
    }
    if let Some(cbu) = cbu.map(str::trim).filter(|c| !c.is_empty()) {
        if cbu.len() != 22 || !cbu.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidRequest(
                "CBU must be exactly 22 digits".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BankAccountResponse {
    pub id: Uuid,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: String,
    pub cbu: Option<String>,
    pub alias: Option<String>,
    pub currency: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BankAccount> for BankAccountResponse {
    fn from(account: BankAccount) -> Self {
        Self {
            id: account.id,
            bank_name: account.bank_name,
            account_number: account.account_number,
            account_type: account.account_type,
            cbu: account.cbu,
            alias: account.alias,
            currency: account.currency,
            balance_cents: account.balance_cents,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_applies_defaults() {
        let request: CreateBankAccountRequest =
            serde_json::from_str(r#"{"bank_name":"Banco Nación","account_number":"123"}"#)
                .unwrap();
        assert_eq!(request.account_type, AccountType::Checking);
        assert_eq!(request.currency, "ARS");
        assert_eq!(request.opening_balance_cents, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn currency_must_match_collection_format() {
        for currency in ["usd", "€"] {
            let request: CreateBankAccountRequest = serde_json::from_str(&format!(
                r#"{{"bank_name":"Banco Nación","account_number":"123","currency":"{}"}}"#,
                currency
            ))
            .unwrap();
            assert!(request.validate().is_err(), "{} accepted", currency);
        }
    }

    #[test]
    fn cbu_must_be_22_digits() {
        assert!(validate_fields("Banco", "1", Some("0110599520000001234567")).is_ok());
        assert!(validate_fields("Banco", "1", Some("0110-5995")).is_err());
        assert!(validate_fields("Banco", "1", Some("  ")).is_ok());
    }

    #[test]
    fn account_type_maps_to_stored_text() {
        assert_eq!(AccountType::Savings.as_str(), "SAVINGS");
    }
}
