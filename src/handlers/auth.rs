//! Login and session HTTP handlers.
//!
//! - POST /api/auth/register - Create company and first admin, returns a token
//! - POST /api/auth/login - Exchange email/password for a bearer token
//! - POST /api/auth/logout - Revoke the current token

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{LoginRequest, LoginResponse, RegisterRequest},
    services::auth_service,
};

/// Register a company and its first admin user.
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "token": "9f86d081884c7d65...",
///   "expires_at": "2025-12-21T07:00:00Z",
///   "user": { "email": "admin@sur.com", "role": "admin", "company_name": "Constructora Sur", ... }
/// }
/// ```
pub async fn register(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = auth_service::register(&pool, request, config.session_ttl_hours).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in.
///
/// # Response
///
/// - **200 OK**: token, expiry and profile
/// - **401**: unknown email, wrong password or deactivated user
pub async fn login(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = auth_service::login(&pool, request, config.session_ttl_hours).await?;
    Ok(Json(response))
}

/// Revoke the token used for this request. Returns 204 No Content.
pub async fn logout(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth_service::logout(&pool, auth.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
