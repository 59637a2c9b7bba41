//! Cash box HTTP handlers.
//!
//! - GET /api/cash-boxes - Paginated list
//! - POST /api/cash-boxes - Create
//! - GET/PUT /api/cash-boxes/{id}
//! - DELETE /api/cash-boxes/{id} - Soft delete
//! - GET/POST /api/cash-boxes/{id}/movements - Deposits and withdrawals

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    domain::listing::{ListParams, Page},
    error::AppError,
    middleware::auth::AuthContext,
    models::cash_box::{
        CASH_BOX_SORT, CashBox, CashBoxFilters, CashBoxResponse, CashMovement,
        CashMovementReceipt, CashMovementRequest, CreateCashBoxRequest, UpdateCashBoxRequest,
    },
    services::treasury_service,
};

const CASH_BOX_COLUMNS: &str =
    "id, name, responsible, currency, balance_cents, is_active, created_at, updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: Uuid,
    params: &ListParams,
    filters: &CashBoxFilters,
) {
    qb.push(" WHERE company_id = ").push_bind(company_id);
    if !filters.include_inactive {
        qb.push(" AND is_active = true");
    }
    if let Some(pattern) = params.search_pattern() {
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR responsible ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_cash_boxes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
    Query(filters): Query<CashBoxFilters>,
) -> Result<Json<Page<CashBoxResponse>>, AppError> {
    let sort_column = CASH_BOX_SORT
        .resolve(params.sort.as_deref())
        .map_err(AppError::InvalidRequest)?;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cash_boxes");
    push_filters(&mut count_query, auth.company_id, &params, &filters);
    let total: i64 = count_query.build_query_scalar().fetch_one(&pool).await?;

    let mut query =
        QueryBuilder::<Postgres>::new(format!("SELECT {CASH_BOX_COLUMNS} FROM cash_boxes"));
    push_filters(&mut query, auth.company_id, &params, &filters);
    query.push(format!(" ORDER BY {} {}, id", sort_column, params.order.as_sql()));
    query.push(" LIMIT ").push_bind(params.per_page());
    query.push(" OFFSET ").push_bind(params.offset());

    let boxes = query.build_query_as::<CashBox>().fetch_all(&pool).await?;

    Ok(Json(Page::new(boxes, total, &params).map(Into::into)))
}

/// Create a cash box. Names are unique per company (409 otherwise).
pub async fn create_cash_box(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCashBoxRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let cash_box = sqlx::query_as::<_, CashBox>(&format!(
        r#"
        INSERT INTO cash_boxes (company_id, name, responsible, currency, balance_cents)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CASH_BOX_COLUMNS}
        "#
    ))
    .bind(auth.company_id)
    .bind(request.name.trim())
    .bind(request.responsible)
    .bind(&request.currency)
    .bind(request.opening_balance_cents)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "A cash box with this name already exists"))?;

    Ok((StatusCode::CREATED, Json(CashBoxResponse::from(cash_box))))
}

pub async fn get_cash_box(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(cash_box_id): Path<Uuid>,
) -> Result<Json<CashBoxResponse>, AppError> {
    let cash_box = sqlx::query_as::<_, CashBox>(&format!(
        "SELECT {CASH_BOX_COLUMNS} FROM cash_boxes WHERE id = $1 AND company_id = $2"
    ))
    .bind(cash_box_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Cash box"))?;

    Ok(Json(cash_box.into()))
}

pub async fn update_cash_box(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(cash_box_id): Path<Uuid>,
    Json(request): Json<UpdateCashBoxRequest>,
) -> Result<Json<CashBoxResponse>, AppError> {
    request.validate()?;

    let cash_box = sqlx::query_as::<_, CashBox>(&format!(
        r#"
        UPDATE cash_boxes
        SET name = $1, responsible = $2, is_active = $3, updated_at = NOW()
        WHERE id = $4 AND company_id = $5
        RETURNING {CASH_BOX_COLUMNS}
        "#
    ))
    .bind(request.name.trim())
    .bind(request.responsible)
    .bind(request.is_active)
    .bind(cash_box_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "A cash box with this name already exists"))?
    .ok_or(AppError::NotFound("Cash box"))?;

    Ok(Json(cash_box.into()))
}

pub async fn delete_cash_box(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(cash_box_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query(
        "UPDATE cash_boxes SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
    )
    .bind(cash_box_id)
    .bind(auth.company_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Cash box"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Post a deposit or withdrawal.
///
/// # Request Body
///
/// ```json
/// { "kind": "WITHDRAWAL", "amount_cents": 25000, "description": "Viáticos" }
/// ```
///
/// # Response
///
/// - **201 Created**: movement and new balance
/// - **422**: withdrawal larger than the balance
pub async fn create_movement(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(cash_box_id): Path<Uuid>,
    Json(request): Json<CashMovementRequest>,
) -> Result<(StatusCode, Json<CashMovementReceipt>), AppError> {
    let receipt =
        treasury_service::post_movement(&pool, auth.company_id, cash_box_id, request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_movements(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(cash_box_id): Path<Uuid>,
) -> Result<Json<Vec<CashMovement>>, AppError> {
    let movements = treasury_service::list_movements(&pool, auth.company_id, cash_box_id).await?;
    Ok(Json(movements))
}
