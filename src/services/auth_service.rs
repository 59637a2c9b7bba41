//! Authentication service - registration, login, sessions and profile.
//!
//! # Credentials
//!
//! Passwords are hashed with bcrypt on a blocking thread. Session tokens
//! are 32 random bytes, hex encoded, and stored only as their SHA-256 hash,
//! so a leaked `sessions` table cannot be replayed.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{
        ChangePasswordRequest, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest,
        UpdateProfileRequest, User, normalize_email,
    },
};

const USER_COLUMNS: &str =
    "id, company_id, email, password_hash, full_name, phone, role, created_at";

/// SHA-256 hex digest of a bearer token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh bearer token (64 hex characters).
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("bcrypt error: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("bcrypt error: {}", e)))
}

/// Create a company and its first admin user, then log them in.
///
/// # Errors
///
/// - `InvalidRequest`: missing fields, bad email, short password
/// - `Conflict`: the email is already registered
pub async fn register(
    pool: &DbPool,
    request: RegisterRequest,
    session_ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    request.validate()?;
    let email = normalize_email(&request.email);
    let password_hash = hash_password(request.password).await?;

    let mut tx = pool.begin().await?;

    let company_id: Uuid = sqlx::query_scalar(
        "INSERT INTO companies (name, tax_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(request.company_name.trim())
    .bind(request.tax_id.as_deref().map(str::trim))
    .fetch_one(&mut *tx)
    .await?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (company_id, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, 'admin')
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(company_id)
    .bind(&email)
    .bind(&password_hash)
    .bind(request.full_name.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "Email is already registered"))?;

    let (token, expires_at) = open_session(&mut tx, user.id, session_ttl_hours).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, company_id = %company_id, "company registered");

    Ok(LoginResponse {
        token,
        expires_at,
        user: ProfileResponse::new(user, request.company_name.trim().to_string()),
    })
}

/// Check credentials and open a new session.
///
/// Unknown email, wrong password and deactivated user all produce the same
/// `InvalidCredentials` error.
pub async fn login(
    pool: &DbPool,
    request: LoginRequest,
    session_ttl_hours: i64,
) -> Result<LoginResponse, AppError> {
    let email = normalize_email(&request.email);

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = true"
    ))
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        tracing::warn!("login attempt for unknown or inactive email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(request.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let mut tx = pool.begin().await?;
    let (token, expires_at) = open_session(&mut tx, user.id, session_ttl_hours).await?;
    tx.commit().await?;

    let company_name = company_name(pool, user.company_id).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(LoginResponse {
        token,
        expires_at,
        user: ProfileResponse::new(user, company_name),
    })
}

async fn open_session(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    session_ttl_hours: i64,
) -> Result<(String, DateTime<Utc>), AppError> {
    let token = generate_token();
    let expires_at = session_expiry(Utc::now(), session_ttl_hours)?;

    sqlx::query("INSERT INTO sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;

    Ok((token, expires_at))
}

fn session_expiry(now: DateTime<Utc>, ttl_hours: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(format!("session TTL of {} hours is out of range", ttl_hours)))
}

/// Revoke the session behind the current request.
pub async fn logout(pool: &DbPool, session_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn company_name(pool: &DbPool, company_id: Uuid) -> Result<String, AppError> {
    let name = sqlx::query_scalar("SELECT name FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_one(pool)
        .await?;
    Ok(name)
}

async fn fetch_user(pool: &DbPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn get_profile(pool: &DbPool, user_id: Uuid) -> Result<ProfileResponse, AppError> {
    let user = fetch_user(pool, user_id).await?;
    let company_name = company_name(pool, user.company_id).await?;
    Ok(ProfileResponse::new(user, company_name))
}

pub async fn update_profile(
    pool: &DbPool,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> Result<ProfileResponse, AppError> {
    request.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET full_name = $1, phone = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(request.full_name.trim())
    .bind(request.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User"))?;

    let company_name = company_name(pool, user.company_id).await?;
    Ok(ProfileResponse::new(user, company_name))
}

/// Change the password after verifying the current one.
///
/// Every other session of the user is revoked; the calling session stays open.
pub async fn change_password(
    pool: &DbPool,
    user_id: Uuid,
    current_session_id: Uuid,
    request: ChangePasswordRequest,
) -> Result<(), AppError> {
    request.validate()?;

    let user = fetch_user(pool, user_id).await?;
    if !verify_password(request.current_password, user.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let new_hash = hash_password(request.new_password).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let revoked = sqlx::query(
        "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND id <> $2 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .bind(current_session_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    tracing::info!(user_id = %user_id, revoked_sessions = revoked, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_rejects_unrepresentable_ttl() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 12).unwrap(), now + Duration::hours(12));
        assert!(session_expiry(now, i64::MAX).is_err());
    }

    #[test]
    fn token_hash_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn generated_tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong horse".to_string(), hash).await.unwrap());
    }
}
