//! Router assembly.
//!
//! Public routes (health, login, register) sit next to an authenticated
//! group guarded by the session middleware.

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, handlers, middleware, state::AppState};

/// CORS for the browser front end: a single origin when configured,
/// permissive otherwise.
pub fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let Some(ref origin) = config.cors_allowed_origin else {
        return Ok(CorsLayer::permissive());
    };

    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let authenticated_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Profile
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).put(handlers::profile::update_profile),
        )
        .route(
            "/api/profile/password",
            put(handlers::profile::change_password),
        )
        // Collections
        .route(
            "/api/collections",
            get(handlers::collections::list_collections)
                .post(handlers::collections::create_collection),
        )
        .route(
            "/api/collections/summary",
            get(handlers::collections::summary),
        )
        .route(
            "/api/collections/generate",
            post(handlers::collections::generate_installments),
        )
        .route(
            "/api/collections/reconcile",
            post(handlers::collections::reconcile),
        )
        .route(
            "/api/collections/{id}",
            get(handlers::collections::get_collection)
                .put(handlers::collections::update_collection)
                .delete(handlers::collections::delete_collection),
        )
        .route(
            "/api/collections/{id}/payments",
            get(handlers::collections::list_payments)
                .post(handlers::collections::register_payment),
        )
        // Payment terms
        .route(
            "/api/payment-terms",
            get(handlers::payment_terms::list_payment_terms)
                .post(handlers::payment_terms::create_payment_term),
        )
        .route(
            "/api/payment-terms/{id}",
            get(handlers::payment_terms::get_payment_term)
                .delete(handlers::payment_terms::delete_payment_term),
        )
        // Rubros
        .route(
            "/api/rubros",
            get(handlers::rubros::list_rubros).post(handlers::rubros::create_rubro),
        )
        .route(
            "/api/rubros/{id}",
            get(handlers::rubros::get_rubro)
                .put(handlers::rubros::update_rubro)
                .delete(handlers::rubros::delete_rubro),
        )
        // Bank accounts
        .route(
            "/api/bank-accounts",
            get(handlers::bank_accounts::list_bank_accounts)
                .post(handlers::bank_accounts::create_bank_account),
        )
        .route(
            "/api/bank-accounts/{id}",
            get(handlers::bank_accounts::get_bank_account)
                .put(handlers::bank_accounts::update_bank_account)
                .delete(handlers::bank_accounts::delete_bank_account),
        )
        // Cash boxes
        .route(
            "/api/cash-boxes",
            get(handlers::cash_boxes::list_cash_boxes)
                .post(handlers::cash_boxes::create_cash_box),
        )
        .route(
            "/api/cash-boxes/{id}",
            get(handlers::cash_boxes::get_cash_box)
                .put(handlers::cash_boxes::update_cash_box)
                .delete(handlers::cash_boxes::delete_cash_box),
        )
        .route(
            "/api/cash-boxes/{id}/movements",
            get(handlers::cash_boxes::list_movements)
                .post(handlers::cash_boxes::create_movement),
        )
        // Support
        .route(
            "/api/support",
            get(handlers::support::list_tickets).post(handlers::support::create_ticket),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth::auth_middleware,
        ));

    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(authenticated_routes)
        .layer(cors_layer(&state.config)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Config::for_tests();
        // Never connects unless a handler or the auth lookup touches it
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::new(pool, config)).unwrap()
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/collections")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn non_bearer_schemes_are_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/rubros")
                    .header("Authorization", "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/invoices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn configured_cors_origin_must_be_a_header_value() {
        let mut config = Config::for_tests();
        config.cors_allowed_origin = Some("https://app.pix.example".to_string());
        assert!(cors_layer(&config).is_ok());

        config.cors_allowed_origin = Some("bad\norigin".to_string());
        assert!(cors_layer(&config).is_err());
    }
}
