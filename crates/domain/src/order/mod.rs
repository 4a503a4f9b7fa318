//! Order aggregate and related types.

mod aggregate;
mod checkout;
mod repository;
mod service;
mod status;
mod status_log;
mod value_objects;

pub use aggregate::{Order, OrderParts, TransitionOutcome};
pub use checkout::CheckoutDetails;
pub use repository::{OrderFilter, OrderRepository, StoreError};
pub use service::OrderService;
pub use status::{OrderStatus, PaymentStatus, TRANSITIONS};
pub use status_log::{ADMIN_NOTE_PREFIX, OrderStatusLog, SYSTEM_ACTOR, default_transition_note};
pub use value_objects::{Address, CURRENCY_SCALE, Money, OrderItem};

use common::VariantId;
use thiserror::Error;

/// Errors raised by order rules and the status state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The value does not name a known status.
    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    /// The transition table has no edge `from -> to`.
    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// One or more input fields were rejected.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid quantity {quantity} for variant {variant_id} (must be greater than 0)")]
    InvalidQuantity { variant_id: VariantId, quantity: i64 },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,
}

impl OrderError {
    /// Builds a validation error with a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(vec![message.into()])
    }
}
