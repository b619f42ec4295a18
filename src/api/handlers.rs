//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::app::AppState;
use crate::domain::{
    Account, AppError, CreateTransferRequest, DatabaseError, ErrorDetail, ErrorResponse,
    HealthResponse, HealthStatus, InnerTransferOrder, OperationResponse, TransferErrorKind,
    TransferInfo, ValidationError,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wallet Ledger API",
        version = "0.1.0",
        description = "Double-entry ledger for moving funds between accounts",
        license(
            name = "MIT"
        )
    ),
    paths(
        create_transfer_handler,
        list_accounts_handler,
        list_account_transfers_handler,
        health_check_handler,
        liveness_handler,
        readiness_handler,
    ),
    components(
        schemas(
            CreateTransferRequest,
            OperationResponse,
            Account,
            TransferInfo,
            crate::domain::TransferType,
            crate::domain::Direction,
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "transfers", description = "Moving funds between accounts"),
        (name = "accounts", description = "Account listings"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Transfer funds between two accounts
///
/// The transfer `id` is chosen by the caller. Sending the same order twice
/// applies it once and returns `OK` both times.
#[utoipa::path(
    post,
    path = "/transfers",
    tag = "transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 200, description = "Transfer applied (or already applied)", body = OperationResponse),
        (status = 400, description = "Malformed body or invalid order", body = ErrorResponse),
        (status = 404, description = "Sender or receiver does not exist", body = ErrorResponse),
        (status = 422, description = "Wrong currency or insufficient funds", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
        (status = 503, description = "Database unavailable", body = ErrorResponse)
    )
)]
pub async fn create_transfer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> Result<Json<OperationResponse>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        AppError::Validation(ValidationError::Multiple(rejection.body_text()))
    })?;

    let order = InnerTransferOrder::from(payload);
    state.service.create_transfer(&order).await?;
    Ok(Json(OperationResponse::ok()))
}

/// List accounts, most recently updated first
#[utoipa::path(
    get,
    path = "/accounts",
    tag = "accounts",
    responses(
        (status = 200, description = "Up to 100 accounts", body = Vec<Account>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_accounts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, AppError> {
    let mut accounts = state.service.get_accounts().await?;
    accounts.reverse();
    Ok(Json(accounts))
}

/// List the latest transfers of one account
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/transfers",
    tag = "accounts",
    params(
        ("account_id" = String, Path, description = "Account ID (UUID)")
    ),
    responses(
        (status = 200, description = "Up to 100 transfers, newest first", body = Vec<TransferInfo>),
        (status = 400, description = "Malformed account id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_account_transfers_handler(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<Vec<TransferInfo>>, AppError> {
    let account_id = Uuid::parse_str(&account_id).map_err(|e| {
        AppError::Validation(ValidationError::InvalidField {
            field: "account_id".to_string(),
            message: e.to_string(),
        })
    })?;
    let transfers = state.service.get_transfers_for_account(account_id).await?;
    Ok(Json(transfers))
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Liveness check for Kubernetes
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness check for Kubernetes
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Application is ready to serve traffic"),
        (status = 503, description = "Database is unreachable")
    )
)]
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.repository.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type, message) = match &self {
            AppError::Transfer(transfer_err) => {
                let status = match transfer_err.kind() {
                    TransferErrorKind::Validation => StatusCode::BAD_REQUEST,
                    TransferErrorKind::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
                    TransferErrorKind::NotFound => StatusCode::NOT_FOUND,
                };
                (status, transfer_err.code(), self.to_string())
            }
            AppError::Database(db_err) => match db_err {
                DatabaseError::Connection(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "database_error",
                    self.to_string(),
                ),
                DatabaseError::EntityNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found", self.to_string())
                }
                DatabaseError::TransferIdUsed | DatabaseError::Duplicate(_) => {
                    (StatusCode::CONFLICT, "duplicate", self.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    self.to_string(),
                ),
            },
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                self.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
