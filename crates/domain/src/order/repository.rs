//! Persistence port for the order aggregate.

use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Page, PageRequest, UserId};
use thiserror::Error;

use super::{Order, OrderStatus};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by an [`OrderRepository`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update targeted an order id that is not stored.
    #[error("Order not found in store: {0}")]
    NotFound(OrderId),

    /// The order changed in the store since it was read.
    #[error("Order {order_id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: i64,
        actual: i64,
    },

    /// A stored row could not be mapped back into the domain model.
    #[error("Corrupt order record: {0}")]
    Corrupt(String),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Wraps any backend error.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        StoreError::Backend(err.into())
    }
}

/// Optional criteria for listing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    /// A filter matching every order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns true if the order satisfies every set criterion.
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|status| order.status() == status)
            && self.user_id.is_none_or(|user_id| order.user_id() == user_id)
    }
}

/// Storage for orders, their items and their status logs.
///
/// `save` writes the order, any unsaved items and any unsaved log entries in
/// one atomic unit and returns the order with every id assigned and its
/// version bumped. Updating an order whose stored version differs from
/// [`Order::version`] fails with [`StoreError::ConcurrencyConflict`]. Pages are
/// sorted by creation time in the requested direction, ties broken by id.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> Result<Order, StoreError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Returns the order only if it belongs to `user_id`.
    async fn find_by_id_and_user_id(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, StoreError>;

    async fn find_all(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError>;

    async fn find_by_user_id(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.find_all(OrderFilter::all().with_user(user_id), page)
            .await
    }
}

#[async_trait]
impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    async fn save(&self, order: Order) -> Result<Order, StoreError> {
        (**self).save(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_id_and_user_id(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, StoreError> {
        (**self).find_by_id_and_user_id(id, user_id).await
    }

    async fn find_all(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        (**self).find_all(filter, page).await
    }

    async fn find_by_user_id(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        (**self).find_by_user_id(user_id, page).await
    }
}
