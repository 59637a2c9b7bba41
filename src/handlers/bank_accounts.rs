//! Bank account HTTP handlers.
//!
//! - GET /api/bank-accounts - Paginated list
//! - POST /api/bank-accounts - Create
//! - GET/PUT /api/bank-accounts/{id}
//! - DELETE /api/bank-accounts/{id} - Soft delete (is_active = false)

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
    models::bank_account::{
        BANK_ACCOUNT_SORT, BankAccount, BankAccountFilters, BankAccountResponse,
        CreateBankAccountRequest, UpdateBankAccountRequest,
    },
};

const BANK_ACCOUNT_COLUMNS: &str = "id, bank_name, account_number, account_type, cbu, \
     alias, currency, balance_cents, is_active, created_at, updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: Uuid,
    params: &ListParams,
    filters: &BankAccountFilters,
) {
    qb.push(" WHERE company_id = ").push_bind(company_id);
    if !filters.include_inactive {
        qb.push(" AND is_active = true");
    }
    if let Some(pattern) = params.search_pattern() {
        qb.push(" AND (bank_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR account_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR alias ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// List bank accounts.
///
/// # Query Parameters
///
/// - `search`: matches bank name, account number or alias
/// - `include_inactive`: also list soft-deleted accounts
/// - `sort`: `bank_name` (default) | `balance` | `created_at`, `order`
/// - `page`, `per_page`
pub async fn list_bank_accounts(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
    Query(filters): Query<BankAccountFilters>,
) -> Result<Json<Page<BankAccountResponse>>, AppError> {
    let sort_column = BANK_ACCOUNT_SORT
        .resolve(params.sort.as_deref())
        .map_err(AppError::InvalidRequest)?;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bank_accounts");
    push_filters(&mut count_query, auth.company_id, &params, &filters);
    let total: i64 = count_query.build_query_scalar().fetch_one(&pool).await?;

    let mut query =
        QueryBuilder::<Postgres>::new(format!("SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts"));
    push_filters(&mut query, auth.company_id, &params, &filters);
    query.push(format!(" ORDER BY {} {}, id", sort_column, params.order.as_sql()));
    query.push(" LIMIT ").push_bind(params.per_page());
    query.push(" OFFSET ").push_bind(params.offset());

    let accounts = query.build_query_as::<BankAccount>().fetch_all(&pool).await?;

    Ok(Json(Page::new(accounts, total, &params).map(Into::into)))
}

/// Create a bank account. Returns 201, or 409 if the same bank/number exists.
pub async fn create_bank_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateBankAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let account = sqlx::query_as::<_, BankAccount>(&format!(
        r#"
        INSERT INTO bank_accounts (
            company_id, bank_name, account_number, account_type, cbu, alias, currency, balance_cents
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {BANK_ACCOUNT_COLUMNS}
        "#
    ))
    .bind(auth.company_id)
    .bind(request.bank_name.trim())
    .bind(request.account_number.trim())
    .bind(request.account_type.as_str())
    .bind(request.cbu.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(request.alias)
    .bind(&request.currency)
    .bind(request.opening_balance_cents)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Bank account already exists"))?;

    Ok((StatusCode::CREATED, Json(BankAccountResponse::from(account))))
}

pub async fn get_bank_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let account = sqlx::query_as::<_, BankAccount>(&format!(
        "SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = $1 AND company_id = $2"
    ))
    .bind(account_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Bank account"))?;

    Ok(Json(account.into()))
}

pub async fn update_bank_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateBankAccountRequest>,
) -> Result<Json<BankAccountResponse>, AppError> {
    request.validate()?;

    let account = sqlx::query_as::<_, BankAccount>(&format!(
        r#"
        UPDATE bank_accounts
        SET bank_name = $1, account_number = $2, account_type = $3, cbu = $4, alias = $5,
            is_active = $6, updated_at = NOW()
        WHERE id = $7 AND company_id = $8
        RETURNING {BANK_ACCOUNT_COLUMNS}
        "#
    ))
    .bind(request.bank_name.trim())
    .bind(request.account_number.trim())
    .bind(request.account_type.as_str())
    .bind(request.cbu.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(request.alias)
    .bind(request.is_active)
    .bind(account_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Bank account already exists"))?
    .ok_or(AppError::NotFound("Bank account"))?;

    Ok(Json(account.into()))
}

/// Soft delete: the account keeps its payment history. Returns 204.
pub async fn delete_bank_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query(
        "UPDATE bank_accounts SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
    )
    .bind(account_id)
    .bind(auth.company_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Bank account"));
    }
    Ok(StatusCode::NO_CONTENT)
}
