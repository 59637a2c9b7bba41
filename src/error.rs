//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::installments::ScheduleError;

/// Application-wide error type.
///
/// Each variant maps to one HTTP status code and a stable machine-readable
/// error code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token is missing, unknown, expired or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthorized,

    /// Email/password pair did not match an active user.
    ///
    /// Returns HTTP 401 Unauthorized. The message never says which half was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Requested resource does not exist or belongs to another company.
    ///
    /// Returns HTTP 404 Not Found. The payload names the resource kind.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request clashes with existing data (duplicate key, record in use).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Cash box or account does not hold enough money for a withdrawal.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Well-formed request that violates a business rule
    /// (overpayment, paying a settled collection).
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("{0}")]
    Unprocessable(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Unexpected failure outside the database (hashing, serialization).
    ///
    /// Returns HTTP 500. Details are logged, never sent to the client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map constraint violations to conflicts and keep everything else as a
    /// database error.
    ///
    /// `what` describes the clashing data, e.g. "Rubro code already exists".
    pub fn from_constraint(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                return AppError::Conflict(what.to_string());
            }
        }
        AppError::Database(err)
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

/// Invalid payment terms and schedules are the caller's fault.
impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "Collection not found"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::Unauthorized.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidCredentials.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("Rubro").parts().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("dup".into()).parts().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InsufficientBalance.parts().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::InvalidRequest("bad".into()).parts().0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        let (_, code, message) = AppError::NotFound("Collection").parts();
        assert_eq!(code, "not_found");
        assert_eq!(message, "Collection not found");
    }

    #[test]
    fn internal_errors_hide_details() {
        let (status, code, message) = AppError::Internal("bcrypt exploded".into()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "internal_error");
        assert!(!message.contains("bcrypt"));
    }

    #[test]
    fn schedule_errors_are_bad_requests() {
        let err: AppError = ScheduleError::PercentageSum(9_000).into();
        let (status, _, message) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("9000"));
    }

    #[test]
    fn non_constraint_errors_stay_database_errors() {
        let err = AppError::from_constraint(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::Database(_)));
    }
}
