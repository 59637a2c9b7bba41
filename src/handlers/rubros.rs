//! Rubro (invoice category) HTTP handlers.
//!
//! - GET /api/rubros - Paginated list with search, `active` filter and sort
//! - POST /api/rubros - Create
//! - GET/PUT/DELETE /api/rubros/{id}

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
    models::rubro::{RUBRO_SORT, Rubro, RubroFilters, RubroRequest},
};

const RUBRO_COLUMNS: &str =
    "id, code, name, description, is_active, created_at, updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: Uuid,
    params: &ListParams,
    filters: &RubroFilters,
) {
    qb.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(pattern) = params.search_pattern() {
        qb.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(active) = filters.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
}

/// List rubros.
///
/// # Query Parameters
///
/// - `search`: matches code or name
/// - `active`: `true` | `false`
/// - `sort`: `code` (default) | `name` | `created_at`, `order`: `asc` | `desc`
/// - `page`, `per_page`
pub async fn list_rubros(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
    Query(filters): Query<RubroFilters>,
) -> Result<Json<Page<Rubro>>, AppError> {
    let sort_column = RUBRO_SORT
        .resolve(params.sort.as_deref())
        .map_err(AppError::InvalidRequest)?;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rubros");
    push_filters(&mut count_query, auth.company_id, &params, &filters);
    let total: i64 = count_query.build_query_scalar().fetch_one(&pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {RUBRO_COLUMNS} FROM rubros"));
    push_filters(&mut query, auth.company_id, &params, &filters);
    query.push(format!(" ORDER BY {} {}, id", sort_column, params.order.as_sql()));
    query.push(" LIMIT ").push_bind(params.per_page());
    query.push(" OFFSET ").push_bind(params.offset());

    let rubros = query.build_query_as::<Rubro>().fetch_all(&pool).await?;

    Ok(Json(Page::new(rubros, total, &params)))
}

/// Create a rubro. Returns 201, or 409 if the code is taken.
pub async fn create_rubro(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<RubroRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let rubro = sqlx::query_as::<_, Rubro>(&format!(
        r#"
        INSERT INTO rubros (company_id, code, name, description, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {RUBRO_COLUMNS}
        "#
    ))
    .bind(auth.company_id)
    .bind(request.normalized_code())
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.is_active)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Rubro code already exists"))?;

    Ok((StatusCode::CREATED, Json(rubro)))
}

pub async fn get_rubro(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(rubro_id): Path<Uuid>,
) -> Result<Json<Rubro>, AppError> {
    let rubro = sqlx::query_as::<_, Rubro>(&format!(
        "SELECT {RUBRO_COLUMNS} FROM rubros WHERE id = $1 AND company_id = $2"
    ))
    .bind(rubro_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Rubro"))?;

    Ok(Json(rubro))
}

pub async fn update_rubro(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(rubro_id): Path<Uuid>,
    Json(request): Json<RubroRequest>,
) -> Result<Json<Rubro>, AppError> {
    request.validate()?;

    let rubro = sqlx::query_as::<_, Rubro>(&format!(
        r#"
        UPDATE rubros
        SET code = $1, name = $2, description = $3, is_active = $4, updated_at = NOW()
        WHERE id = $5 AND company_id = $6
        RETURNING {RUBRO_COLUMNS}
        "#
    ))
    .bind(request.normalized_code())
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.is_active)
    .bind(rubro_id)
    .bind(auth.company_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Rubro code already exists"))?
    .ok_or(AppError::NotFound("Rubro"))?;

    Ok(Json(rubro))
}

/// Delete a rubro. Returns 409 while collections still reference it.
pub async fn delete_rubro(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(rubro_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM rubros WHERE id = $1 AND company_id = $2")
        .bind(rubro_id)
        .bind(auth.company_id)
        .execute(&pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Rubro is used by existing collections"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Rubro"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_filter_and_search_are_bound() {
        let params = ListParams {
            search: Some("mat".to_string()),
            ..Default::default()
        };
        let filters = RubroFilters { active: Some(true) };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rubros");
        push_filters(&mut qb, Uuid::new_v4(), &params, &filters);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM rubros WHERE company_id = $1 AND (code ILIKE $2 OR name ILIKE $3) AND is_active = $4"
        );
    }
}
