//! Payment term HTTP handlers.
//!
//! - GET /api/payment-terms
//! - POST /api/payment-terms
//! - GET /api/payment-terms/{id}
//! - DELETE /api/payment-terms/{id}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::types::Json as JsonColumn;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::payment_term::{CreatePaymentTermRequest, PaymentTerm, PaymentTermResponse},
};

const TERM_COLUMNS: &str =
    "id, name, installment_count, frequency, first_due_offset_days, percentages, created_at";

pub async fn list_payment_terms(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PaymentTermResponse>>, AppError> {
    let terms = sqlx::query_as::<_, PaymentTerm>(&format!(
        "SELECT {TERM_COLUMNS} FROM payment_terms WHERE company_id = $1 ORDER BY name"
    ))
    .bind(auth.company_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(terms.into_iter().map(Into::into).collect()))
}

/// Create a payment term.
///
/// # Validation
///
/// - `installment_count` between 1 and 120
/// - `first_due_offset_days` >= 0
/// - `percentages`, when given, one per installment and summing to 100
/// - `name` unique per company (409 otherwise)
pub async fn create_payment_term(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreatePaymentTermRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }
    let template = request.to_template()?;

    let term = sqlx::query_as::<_, PaymentTerm>(&format!(
        r#"
        INSERT INTO payment_terms (
            company_id, name, installment_count, frequency, first_due_offset_days, percentages
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {TERM_COLUMNS}
        "#
    ))
    .bind(auth.company_id)
    .bind(request.name.trim())
    .bind(template.installment_count)
    .bind(template.frequency)
    .bind(template.first_due_offset_days)
    .bind(template.percentages.map(JsonColumn))
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "A payment term with this name already exists"))?;

    Ok((StatusCode::CREATED, Json(PaymentTermResponse::from(term))))
}

pub async fn get_payment_term(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(term_id): Path<Uuid>,
) -> Result<Json<PaymentTermResponse>, AppError> {
    let term = sqlx::query_as::<_, PaymentTerm>(&format!(
        "SELECT {TERM_COLUMNS} FROM payment_terms WHERE id = $1 AND company_id = $2"
    ))
    .bind(term_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Payment term"))?;

    Ok(Json(term.into()))
}

/// Delete a payment term. Collections already generated from it keep their
/// installments; their `payment_term_id` becomes null.
pub async fn delete_payment_term(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(term_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM payment_terms WHERE id = $1 AND company_id = $2")
        .bind(term_id)
        .bind(auth.company_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Payment term"));
    }
    Ok(StatusCode::NO_CONTENT)
}
