//! Support page handlers.

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::support::{CreateTicketRequest, SupportTicket},
    services::support_service,
};

/// Open a support ticket.
///
/// # Response
///
/// Returns 201 Created with the ticket. `notified` tells whether the
/// support desk webhook accepted it.
pub async fn create_ticket(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ticket =
        support_service::create_ticket(&pool, &auth, config.support_webhook(), request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<SupportTicket>>, AppError> {
    let tickets = support_service::list_tickets(&pool, auth.company_id).await?;
    Ok(Json(tickets))
}
