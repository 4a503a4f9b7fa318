//! Application service for reading orders and driving the status state machine.

use common::{OrderId, Page, PageRequest, UserId};

use crate::error::DomainError;

use super::{Order, OrderFilter, OrderRepository, OrderStatus, TransitionOutcome};

/// Service for order reads, status transitions and admin notes.
///
/// Every mutation loads the order, applies the rule on the aggregate and
/// saves order plus new log entry in one repository call. The save is
/// conditional on the version that was loaded, so of two racing writers one
/// gets [`StoreError::ConcurrencyConflict`] and nothing of it is stored.
///
/// [`StoreError::ConcurrencyConflict`]: super::StoreError::ConcurrencyConflict
#[derive(Debug, Clone)]
pub struct OrderService<R> {
    repository: R,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service backed by the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.repository
            .find_by_id(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    /// Loads an order only if it belongs to `user_id`.
    ///
    /// Orders owned by someone else are reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, DomainError> {
        self.repository
            .find_by_id_and_user_id(order_id, user_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Order>, DomainError> {
        Ok(self.repository.find_by_user_id(user_id, page).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, DomainError> {
        Ok(self.repository.find_all(filter, page).await?)
    }

    /// Moves an order to the status named by `new_status`.
    ///
    /// The log entry reads "Status changed by <actor>".
    pub async fn transition(
        &self,
        order_id: OrderId,
        new_status: &str,
        actor: &str,
    ) -> Result<Order, DomainError> {
        self.transition_with_note(order_id, new_status, actor, None)
            .await
    }

    /// Like [`OrderService::transition`], with a caller-supplied note.
    #[tracing::instrument(skip(self, note))]
    pub async fn transition_with_note(
        &self,
        order_id: OrderId,
        new_status: &str,
        actor: &str,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self.get_order(order_id).await?;
        let target: OrderStatus = new_status.parse()?;
        self.apply_transition(order, target, actor, note).await
    }

    /// Typed variant used by internal callers that already hold a status.
    #[tracing::instrument(skip(self, note))]
    pub async fn transition_to(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        actor: &str,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        let order = self.get_order(order_id).await?;
        self.apply_transition(order, target, actor, note).await
    }

    /// Appends an "Admin Note: <text>" entry without changing the status.
    #[tracing::instrument(skip(self, text))]
    pub async fn add_note(
        &self,
        order_id: OrderId,
        text: &str,
        actor: &str,
    ) -> Result<Order, DomainError> {
        let mut order = self.get_order(order_id).await?;
        order.add_note(actor, text)?;
        let saved = self.repository.save(order).await?;

        metrics::counter!("order_notes_added_total").increment(1);
        tracing::info!(%order_id, actor, "note added to order");
        Ok(saved)
    }

    async fn apply_transition(
        &self,
        mut order: Order,
        target: OrderStatus,
        actor: &str,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        let from = order.status();
        match order.transition(target, actor, note) {
            Ok(TransitionOutcome::Unchanged) => {
                tracing::debug!(status = %from, "order already in requested status");
                return Ok(order);
            }
            Ok(TransitionOutcome::Changed) => {}
            Err(e) => {
                metrics::counter!("order_transitions_rejected_total").increment(1);
                tracing::warn!(%from, to = %target, actor, "status transition rejected");
                return Err(e.into());
            }
        }

        let saved = self.repository.save(order).await.inspect_err(|e| {
            tracing::warn!(%from, to = %target, actor, error = %e, "status change not saved");
        })?;

        metrics::counter!(
            "order_status_transitions_total",
            "from" => from.as_str(),
            "to" => target.as_str()
        )
        .increment(1);
        tracing::info!(%from, to = %target, actor, "order status changed");
        Ok(saved)
    }
}
