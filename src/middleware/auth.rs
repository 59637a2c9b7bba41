//! Session-token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Hash it and look up a live session for an active user
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{db::DbPool, error::AppError, services::auth_service};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`. `company_id` is the
/// tenant every query must be filtered by.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
}

#[derive(sqlx::FromRow)]
struct SessionOwner {
    session_id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    email: String,
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Read `Authorization: Bearer <token>`
/// 2. Hash the token with SHA-256
/// 3. Find a session with that hash that is not revoked, not expired, and
///    whose user is still active
/// 4. If found: inject `AuthContext`, call next handler
/// 5. If not: 401 Unauthorized
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let token = bearer_token(header)?;

    let token_hash = auth_service::hash_token(token);

    let owner = sqlx::query_as::<_, SessionOwner>(
        r#"
        SELECT s.id AS session_id, u.id AS user_id, u.company_id, u.email
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1
          AND s.revoked_at IS NULL
          AND s.expires_at > NOW()
          AND u.is_active = true
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthContext {
        session_id: owner.session_id,
        user_id: owner.user_id,
        company_id: owner.company_id,
        email: owner.email,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer abc123")).unwrap(), "abc123");
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Basic abc123")).is_err());
        assert!(bearer_token(Some("Bearer   ")).is_err());
    }
}
