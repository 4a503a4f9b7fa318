//! Domain error types.

use common::OrderId;
use thiserror::Error;

use crate::order::{OrderError, StoreError};

/// Errors returned by [`crate::OrderService`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business rule rejected the request.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The repository failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}
