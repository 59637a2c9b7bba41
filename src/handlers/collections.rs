//! Collections (accounts receivable) HTTP handlers.
//!
//! This module implements the collection-related API endpoints:
//! - GET /api/collections - Filtered, sorted, paginated list
//! - GET /api/collections/summary - Per-status totals
//! - POST /api/collections - Create a single collection
//! - POST /api/collections/generate - Generate installments from a payment term
//! - POST /api/collections/reconcile - Recompute overdue statuses
//! - GET/PUT/DELETE /api/collections/{id}
//! - GET/POST /api/collections/{id}/payments

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    domain::listing::{ListParams, Page},
    error::AppError,
    middleware::auth::AuthContext,
    models::collection::{
        CollectionFilters, CollectionPayment, CollectionResponse, CollectionSummary,
        CreateCollectionRequest, GenerateInstallmentsRequest, GeneratedInstallments,
        PaymentReceipt, ReconcileResponse, RegisterPaymentRequest, UpdateCollectionRequest,
    },
    services::collection_service,
};

/// List collections.
///
/// # Query Parameters
///
/// - `search`: matches client name, invoice number or description
/// - `status`: `PENDING` | `PARTIAL` | `PAID` | `OVERDUE`
/// - `rubro_id`, `due_from`, `due_to`
/// - `sort`: `due_date` (default) | `amount` | `client_name` | `status` | `created_at`
/// - `order`: `asc` (default) | `desc`
/// - `page`, `per_page` (default 20, max 100)
///
/// Statuses are reconciled against today's date before the query runs.
///
/// # Response
///
/// ```json
/// {
///   "items": [ { "id": "...", "client_name": "Obra Norte SRL", "status": "OVERDUE", ... } ],
///   "total": 42,
///   "page": 1,
///   "per_page": 20,
///   "total_pages": 3
/// }
/// ```
pub async fn list_collections(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
    Query(filters): Query<CollectionFilters>,
) -> Result<Json<Page<CollectionResponse>>, AppError> {
    let page =
        collection_service::list_collections(&pool, auth.company_id, &params, &filters).await?;
    Ok(Json(page.map(Into::into)))
}

pub async fn summary(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CollectionSummary>, AppError> {
    let summary = collection_service::summarize(&pool, auth.company_id).await?;
    Ok(Json(summary))
}

/// Create a single collection. Returns 201 Created.
pub async fn create_collection(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let collection =
        collection_service::create_collection(&pool, auth.company_id, request).await?;
    Ok((StatusCode::CREATED, Json(CollectionResponse::from(collection))))
}

/// Generate installment collections from a payment term.
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "installment_group_id": "770e8400-...",
///   "collections": [
///     { "installment_number": 1, "installment_count": 3, "amount_cents": 300000, "due_date": "2025-02-14", ... },
///     { "installment_number": 2, "installment_count": 3, "amount_cents": 300000, "due_date": "2025-03-14", ... },
///     { "installment_number": 3, "installment_count": 3, "amount_cents": 300000, "due_date": "2025-04-14", ... }
///   ]
/// }
/// ```
pub async fn generate_installments(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<GenerateInstallmentsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (installment_group_id, collections) =
        collection_service::generate_installments(&pool, auth.company_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(GeneratedInstallments {
            installment_group_id,
            collections: collections.into_iter().map(Into::into).collect(),
        }),
    ))
}

pub async fn reconcile(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let updated =
        collection_service::reconcile_statuses(&pool, auth.company_id, collection_service::today())
            .await?;
    Ok(Json(ReconcileResponse { updated }))
}

pub async fn get_collection(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(collection_id): Path<Uuid>,
) -> Result<Json<CollectionResponse>, AppError> {
    let collection =
        collection_service::get_collection(&pool, auth.company_id, collection_id).await?;
    Ok(Json(collection.into()))
}

pub async fn update_collection(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(collection_id): Path<Uuid>,
    Json(request): Json<UpdateCollectionRequest>,
) -> Result<Json<CollectionResponse>, AppError> {
    let collection =
        collection_service::update_collection(&pool, auth.company_id, collection_id, request)
            .await?;
    Ok(Json(collection.into()))
}

/// Delete a collection. Returns 204, or 409 if it has payments.
pub async fn delete_collection(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(collection_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    collection_service::delete_collection(&pool, auth.company_id, collection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Register a payment.
///
/// # Request Body
///
/// ```json
/// {
///   "amount_cents": 50000,
///   "paid_on": "2025-03-05",
///   "bank_account_id": "880e8400-...",
///   "note": "Transferencia"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the payment and the updated collection
/// - **404**: collection, bank account or cash box not found
/// - **422**: already paid, overpayment or currency mismatch
pub async fn register_payment(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(collection_id): Path<Uuid>,
    Json(request): Json<RegisterPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>), AppError> {
    let receipt =
        collection_service::register_payment(&pool, auth.company_id, collection_id, request)
            .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_payments(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(collection_id): Path<Uuid>,
) -> Result<Json<Vec<CollectionPayment>>, AppError> {
    let payments =
        collection_service::list_payments(&pool, auth.company_id, collection_id).await?;
    Ok(Json(payments))
}
