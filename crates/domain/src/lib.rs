//! Domain layer for the order service.
//!
//! This crate provides:
//! - The `Order` aggregate with items and an append-only status log
//! - The `OrderStatus` transition table and `PaymentStatus`
//! - Checkout details validation
//! - The `OrderRepository` persistence port
//! - `OrderService`, which enforces the state machine on stored orders

pub mod error;
pub mod order;

pub use error::DomainError;
pub use order::{
    ADMIN_NOTE_PREFIX, Address, CURRENCY_SCALE, CheckoutDetails, Money, Order, OrderError,
    OrderFilter, OrderItem, OrderParts, OrderRepository, OrderService, OrderStatus,
    OrderStatusLog, PaymentStatus, SYSTEM_ACTOR, StoreError, TRANSITIONS, TransitionOutcome,
    default_transition_note,
};
