//! User, company and session models.
//!
//! Passwords are stored as bcrypt hashes. Session rows live only in SQL
//! (see `services::auth_service`); the raw token is returned once, at login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Represents a user record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Tenant this user works for; every query they make is scoped to it
    pub company_id: Uuid,

    pub email: String,

    /// bcrypt hash, never serialized
    pub password_hash: String,

    pub full_name: String,
    pub phone: Option<String>,

    /// "admin" or "member"
    pub role: String,

    pub created_at: DateTime<Utc>,
}

/// Request body for creating a company together with its first admin.
///
/// ```json
/// {
///   "company_name": "Constructora Sur",
///   "tax_id": "30-71234567-8",
///   "email": "admin@sur.com",
///   "password": "correct horse",
///   "full_name": "Ana Pérez"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    pub tax_id: Option<String>,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.company_name.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Company name is required".to_string(),
            ));
        }
        if self.full_name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Full name is required".to_string()));
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by a successful login or registration.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header (only shown here)
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: ProfileResponse,
}

/// Profile page payload.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn new(user: User, company_name: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            role: user.role,
            company_id: user.company_id,
            company_name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub phone: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Full name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_password(&self.new_password)?;
        if self.new_password == self.current_password {
            return Err(AppError::InvalidRequest(
                "New password must differ from the current one".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lower-case and trim so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(AppError::InvalidRequest("Invalid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            company_name: "Constructora Sur".to_string(),
            tax_id: None,
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Ana Pérez".to_string(),
        }
    }

    #[test]
    fn register_requires_valid_email_and_password() {
        assert!(register("ana@sur.com", "longenough").validate().is_ok());
        assert!(register("ana.sur.com", "longenough").validate().is_err());
        assert!(register("@sur.com", "longenough").validate().is_err());
        assert!(register("ana@sur.com", "short").validate().is_err());
    }

    #[test]
    fn change_password_rejects_reuse() {
        let request = ChangePasswordRequest {
            current_password: "same-password".to_string(),
            new_password: "same-password".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Sur.COM "), "ana@sur.com");
    }
}
