//! Rubro (invoice category) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::listing::SortSpec, error::AppError};

/// Represents a rubro record from the database.
///
/// `code` is unique per company.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Rubro {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sortable columns for `GET /api/rubros`.
pub const RUBRO_SORT: SortSpec = SortSpec {
    columns: &[
        ("code", "code"),
        ("name", "name"),
        ("created_at", "created_at"),
    ],
    default_key: "code",
};

/// Extra filters for the rubro list, on top of the common list params.
#[derive(Debug, Default, Deserialize)]
pub struct RubroFilters {
    pub active: Option<bool>,
}

/// Body for both create and update.
///
/// ```json
/// { "code": "MAT", "name": "Materiales", "description": "Obra gruesa" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RubroRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl RubroRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let code = self.code.trim();
        if code.is_empty() || code.len() > 20 {
            return Err(AppError::InvalidRequest(
                "Code must be between 1 and 20 characters".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        Ok(())
    }

    /// Codes are stored trimmed and upper-cased.
    pub fn normalized_code(&self) -> String {
        self.code.trim().to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_trimmed_and_upper_cased() {
        let request = RubroRequest {
            code: " mat ".to_string(),
            name: "Materiales".to_string(),
            description: None,
            is_active: true,
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.normalized_code(), "MAT");
    }

    #[test]
    fn blank_fields_are_rejected() {
        let request: RubroRequest = serde_json::from_str(r#"{"code":"  ","name":"x"}"#).unwrap();
        assert!(request.is_active);
        assert!(request.validate().is_err());

        let request: RubroRequest = serde_json::from_str(r#"{"code":"MO","name":""}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
