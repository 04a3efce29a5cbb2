//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, StoreError};
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Inventory-side domain error.
    Domain(DomainError),
    /// Order-side saga or lifecycle error.
    Saga(SagaError),
}

impl ApiError {
    /// Status code and message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Domain(err) => (domain_status(err), err.to_string()),
            ApiError::Saga(err) => (saga_status(err), err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_status(err: &OrderError) -> StatusCode {
    if err.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CONFLICT
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::StatusConflict { .. } => StatusCode::CONFLICT,
        StoreError::InvariantViolation { .. } | StoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Order(e) => order_status(e),
        DomainError::Product(_) => StatusCode::BAD_REQUEST,
        DomainError::Store(e) => store_status(e),
        DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::ProductNotFound(_) | SagaError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SagaError::InvalidOrder(e) => order_status(e),
        SagaError::Conflict(_) => StatusCode::CONFLICT,
        SagaError::Store(e) => store_status(e),
        SagaError::InventoryService(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SagaError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
