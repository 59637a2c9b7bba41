//! Profile page handlers.
//!
//! - GET /api/profile
//! - PUT /api/profile
//! - PUT /api/profile/password

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{ChangePasswordRequest, ProfileResponse, UpdateProfileRequest},
    services::auth_service,
};

pub async fn get_profile(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = auth_service::get_profile(&pool, auth.user_id).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = auth_service::update_profile(&pool, auth.user_id, request).await?;
    Ok(Json(profile))
}

/// Change password. Other sessions of the user are logged out.
///
/// # Response
///
/// - **204 No Content** on success
/// - **401** if the current password is wrong
pub async fn change_password(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::change_password(&pool, auth.user_id, auth.session_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
