//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, StoreError};
use saga::SagaError;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Identity headers are missing or malformed.
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Saga(#[from] SagaError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

struct Mapped {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl Mapped {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mapped = match self {
            ApiError::NotFound(msg) => Mapped::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => Mapped::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => {
                Mapped::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg)
            }
            ApiError::Domain(err) => map_domain(err),
            ApiError::Saga(err) => map_saga(err),
        };

        let body = ErrorBody {
            error: mapped.message,
            code: mapped.code,
            details: mapped.details,
        };
        (mapped.status, Json(body)).into_response()
    }
}

fn map_order(err: OrderError) -> Mapped {
    match &err {
        OrderError::InvalidStatus { value } => {
            let details = json!({ "value": value });
            Mapped::new(StatusCode::BAD_REQUEST, "INVALID_STATUS", err.to_string())
                .with_details(details)
        }
        OrderError::IllegalTransition { from, to } => {
            let details = json!({ "from": from.as_str(), "to": to.as_str() });
            Mapped::new(StatusCode::CONFLICT, "ILLEGAL_TRANSITION", err.to_string())
                .with_details(details)
        }
        OrderError::Validation(violations) => {
            let details = json!({ "violations": violations });
            Mapped::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.to_string())
                .with_details(details)
        }
        OrderError::InvalidQuantity { .. } | OrderError::NoItems => {
            Mapped::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.to_string())
        }
    }
}

fn map_store(err: StoreError) -> Mapped {
    match err {
        StoreError::NotFound(id) => Mapped::new(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            format!("Order {id} not found"),
        ),
        StoreError::ConcurrencyConflict { order_id, .. } => Mapped::new(
            StatusCode::CONFLICT,
            "CONCURRENT_MODIFICATION",
            format!("Order {order_id} was changed by another request, reload and retry"),
        )
        .with_details(json!({ "order_id": order_id })),
        other => {
            tracing::error!(error = %other, "order store failure");
            Mapped::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "Internal server error",
            )
        }
    }
}

fn map_domain(err: DomainError) -> Mapped {
    match err {
        DomainError::Order(order_err) => map_order(order_err),
        DomainError::Store(store_err) => map_store(store_err),
        DomainError::OrderNotFound(id) => Mapped::new(
            StatusCode::NOT_FOUND,
            "ORDER_NOT_FOUND",
            format!("Order {id} not found"),
        ),
    }
}

fn map_saga(err: SagaError) -> Mapped {
    let message = err.to_string();
    match err {
        SagaError::EmptyCart { .. } => Mapped::new(StatusCode::BAD_REQUEST, "EMPTY_CART", message),
        SagaError::ProductUnavailable { variant_id } => {
            Mapped::new(StatusCode::BAD_REQUEST, "PRODUCT_UNAVAILABLE", message)
                .with_details(json!({ "variant_id": variant_id }))
        }
        SagaError::InsufficientStock {
            variant_id,
            product_name,
            requested,
            available,
        } => Mapped::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message).with_details(
            json!({
                "variant_id": variant_id,
                "product_name": product_name,
                "requested": requested,
                "available": available,
            }),
        ),
        SagaError::CartUnavailable(_) => {
            Mapped::new(StatusCode::BAD_GATEWAY, "CART_UNAVAILABLE", message)
        }
        SagaError::CatalogUnavailable(_) => {
            Mapped::new(StatusCode::BAD_GATEWAY, "CATALOG_UNAVAILABLE", message)
        }
        SagaError::StockCommitFailed {
            order_id,
            variant_id,
            ..
        } => Mapped::new(StatusCode::BAD_GATEWAY, "STOCK_COMMIT_FAILED", message)
            .with_details(json!({ "order_id": order_id, "variant_id": variant_id })),
        SagaError::Validation(order_err) => map_order(order_err),
        SagaError::Domain(domain_err) => map_domain(domain_err),
        SagaError::MissingStepOutput(_) => {
            tracing::error!(error = %message, "checkout saga ended inconsistently");
            Mapped::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            )
        }
    }
}
