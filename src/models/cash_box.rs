//! Cash box and cash movement models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{default_currency, validate_currency};
use crate::{domain::listing::SortSpec, error::AppError};

/// Represents a cash box (petty cash) record from the database.
///
/// `balance_cents` must stay >= 0 (enforced by CHECK constraint and by the
/// withdrawal path, which locks the row before checking).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CashBox {
    pub id: Uuid,
    pub name: String,
    /// Person in charge of the box
    pub responsible: Option<String>,
    pub currency: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deposit into or withdrawal from a cash box.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CashMovement {
    pub id: Uuid,
    pub cash_box_id: Uuid,
    /// "DEPOSIT" or "WITHDRAWAL"
    pub kind: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const CASH_BOX_SORT: SortSpec = SortSpec {
    columns: &[
        ("name", "name"),
        ("balance", "balance_cents"),
        ("created_at", "created_at"),
    ],
    default_key: "name",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Deposit,
    Withdrawal,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Deposit => "DEPOSIT",
            MovementKind::Withdrawal => "WITHDRAWAL",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CashBoxFilters {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Body for creating a cash box.
///
/// ```json
/// { "name": "Caja obra Norte", "responsible": "J. Gómez", "currency": "ARS" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCashBoxRequest {
    pub name: String,
    pub responsible: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

impl CreateCashBoxRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        if self.opening_balance_cents < 0 {
            return Err(AppError::InvalidRequest(
                "Opening balance cannot be negative".to_string(),
            ));
        }
        validate_currency(&self.currency)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCashBoxRequest {
    pub name: String,
    pub responsible: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl UpdateCashBoxRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        Ok(())
    }
}

/// Body for `POST /api/cash-boxes/{id}/movements`.
#[derive(Debug, Deserialize)]
pub struct CashMovementRequest {
    pub kind: MovementKind,
    pub amount_cents: i64,
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CashBoxResponse {
    pub id: Uuid,
    pub name: String,
    pub responsible: Option<String>,
    pub currency: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CashBox> for CashBoxResponse {
    fn from(cash_box: CashBox) -> Self {
        Self {
            id: cash_box.id,
            name: cash_box.name,
            responsible: cash_box.responsible,
            currency: cash_box.currency,
            balance_cents: cash_box.balance_cents,
            is_active: cash_box.is_active,
            created_at: cash_box.created_at,
            updated_at: cash_box.updated_at,
        }
    }
}

/// Result of posting a movement: the movement and the new balance.
#[derive(Debug, Serialize)]
pub struct CashMovementReceipt {
    pub movement: CashMovement,
    pub balance_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_parses_upper_case() {
        let request: CashMovementRequest =
            serde_json::from_str(r#"{"kind":"WITHDRAWAL","amount_cents":500}"#).unwrap();
        assert_eq!(request.kind, MovementKind::Withdrawal);
        assert_eq!(request.kind.as_str(), "WITHDRAWAL");
    }

    #[test]
    fn negative_opening_balance_is_rejected() {
        let request = CreateCashBoxRequest {
            name: "Caja chica".to_string(),
            responsible: None,
            currency: "ARS".to_string(),
            opening_balance_cents: -1,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn lower_case_or_multibyte_currency_is_rejected() {
        let mut request = CreateCashBoxRequest {
            name: "Caja chica".to_string(),
            responsible: None,
            currency: "usd".to_string(),
            opening_balance_cents: 0,
        };
        assert!(request.validate().is_err());
        request.currency = "€".to_string();
        assert!(request.validate().is_err());
        request.currency = "USD".to_string();
        assert!(request.validate().is_ok());
    }
}
