//! Health check endpoint used by load balancers and uptime monitors.

use crate::db::DbPool;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: &'static str,

    /// "connected" or "unreachable"
    pub database: &'static str,

    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "version": "0.1.0",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// Answers 503 with `"status": "degraded"` when the database does not
/// respond, so the instance is taken out of rotation.
pub async fn health_check(State(pool): State<DbPool>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("health check could not reach database: {}", e);
            false
        }
    };

    let (code, status, database) = if database_ok {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }),
    )
}
