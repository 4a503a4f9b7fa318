use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Page, PageRequest, SortDirection, UserId};
use domain::{Order, OrderFilter, OrderRepository, StoreError};
use tokio::sync::RwLock;

/// In-memory order repository.
///
/// Assigns sequential ids like a database sequence would and offers the
/// same query semantics as the PostgreSQL implementation. Used by tests and
/// when the service runs without `DATABASE_URL`.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    orders: HashMap<OrderId, Order>,
    last_order_id: i64,
    last_item_id: i64,
    last_log_id: i64,
    save_count: usize,
    fail_on_save: bool,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns how many times `save` has succeeded.
    pub async fn save_count(&self) -> usize {
        self.state.read().await.save_count
    }

    /// Makes every subsequent `save` fail with a backend error.
    pub async fn set_fail_on_save(&self, fail: bool) {
        self.state.write().await.fail_on_save = fail;
    }

    /// Removes all orders. Id sequences keep counting.
    pub async fn clear(&self) {
        self.state.write().await.orders.clear();
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<Order, StoreError> {
        let mut state = self.state.write().await;
        if state.fail_on_save {
            return Err(StoreError::backend("simulated save failure"));
        }

        let mut parts = order.into_parts();
        let id = match parts.id {
            Some(id) => {
                let stored = state.orders.get(&id).ok_or(StoreError::NotFound(id))?;
                if stored.version() != parts.version {
                    return Err(StoreError::ConcurrencyConflict {
                        order_id: id,
                        expected: parts.version,
                        actual: stored.version(),
                    });
                }
                id
            }
            None => {
                state.last_order_id += 1;
                OrderId::new(state.last_order_id)
            }
        };
        parts.id = Some(id);
        parts.version += 1;

        for item in parts.items.iter_mut().filter(|item| item.id.is_none()) {
            state.last_item_id += 1;
            item.id = Some(state.last_item_id);
        }
        for log in parts.status_logs.iter_mut().filter(|log| log.id.is_none()) {
            state.last_log_id += 1;
            log.id = Some(state.last_log_id);
        }

        let order = Order::from(parts);
        state.orders.insert(id, order.clone());
        state.save_count += 1;

        tracing::debug!(order_id = %id, "order saved in memory");
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_by_id_and_user_id(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .get(&id)
            .filter(|order| order.user_id() == user_id)
            .cloned())
    }

    async fn find_all(
        &self,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        let state = self.state.read().await;
        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .collect();

        matching.sort_by_key(|order| (order.created_at(), order.id()));
        if page.direction() == SortDirection::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size() as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, page, total))
    }
}
