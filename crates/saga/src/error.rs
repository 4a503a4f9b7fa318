//! Saga error types.

use common::{OrderId, UserId, VariantId};
use domain::{DomainError, OrderError};
use thiserror::Error;

/// Errors raised by a cart or catalog gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// The service could not be reached.
    #[error("{0} unavailable")]
    Unavailable(String),
}

/// Errors surfaced by the checkout saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The caller has no cart or the cart has no lines.
    #[error("Cart is empty for user {user_id}")]
    EmptyCart { user_id: UserId },

    #[error("Cart service unavailable: {0}")]
    CartUnavailable(#[source] GatewayError),

    #[error("Product catalog unavailable: {0}")]
    CatalogUnavailable(#[source] GatewayError),

    /// The catalog does not know a variant referenced by the cart.
    #[error("Product variant {variant_id} is unavailable")]
    ProductUnavailable { variant_id: VariantId },

    #[error(
        "Insufficient stock for '{product_name}' (variant {variant_id}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// The order was persisted but a stock update failed. The order has been
    /// marked failed and needs reconciliation.
    #[error("Stock update failed for variant {variant_id} of order {order_id}: {reason}")]
    StockCommitFailed {
        order_id: OrderId,
        variant_id: VariantId,
        reason: String,
    },

    /// Checkout input was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] OrderError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// A step finished without producing the value later steps rely on.
    #[error("Saga finished without {0}")]
    MissingStepOutput(&'static str),
}

impl SagaError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SagaError::EmptyCart { .. } => "empty_cart",
            SagaError::CartUnavailable(_) => "cart_unavailable",
            SagaError::CatalogUnavailable(_) => "catalog_unavailable",
            SagaError::ProductUnavailable { .. } => "product_unavailable",
            SagaError::InsufficientStock { .. } => "insufficient_stock",
            SagaError::StockCommitFailed { .. } => "stock_commit_failed",
            SagaError::Validation(_) => "validation",
            SagaError::Domain(_) => "domain",
            SagaError::MissingStepOutput(_) => "missing_step_output",
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
