//! Router assembly and HTTP middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::app::AppState;

use super::handlers::{
    ApiDoc, create_transfer_handler, health_check_handler, list_account_transfers_handler,
    list_accounts_handler, liveness_handler, readiness_handler,
};

/// HTTP middleware settings
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Deadline for a single request, including the database transaction
    pub request_timeout: Duration,
    /// Maximum accepted request body in bytes
    pub body_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            body_limit: 64 * 1024,
        }
    }
}

/// Create the router with default middleware settings
pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with_config(state, RouterConfig::default())
}

pub fn create_router_with_config(state: Arc<AppState>, config: RouterConfig) -> Router {
    let api = Router::new()
        .route("/transfers", post(create_transfer_handler))
        .route("/accounts", get(list_accounts_handler))
        .route(
            "/accounts/{account_id}/transfers",
            get(list_account_transfers_handler),
        )
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state);

    api.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(RequestBodyLimitLayer::new(config.body_limit))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
