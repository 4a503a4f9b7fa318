//! Cart gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{UserId, VariantId};
use domain::Money;
use tokio::sync::RwLock;

use super::CallerContext;
use crate::error::GatewayError;

/// One line of the caller's cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub variant_id: VariantId,
    pub quantity: i32,
    /// Price the cart last displayed. The catalog price is what gets charged.
    pub unit_price: Option<Money>,
}

impl CartLine {
    pub fn new(variant_id: impl Into<VariantId>, quantity: i32) -> Self {
        Self {
            variant_id: variant_id.into(),
            quantity,
            unit_price: None,
        }
    }
}

/// The caller's cart at checkout time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn new(items: Vec<CartLine>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Access to the cart service.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Returns the caller's cart, or `None` if the caller has none.
    async fn get_cart(&self, caller: &CallerContext) -> Result<Option<CartSnapshot>, GatewayError>;

    /// Empties the caller's cart.
    async fn clear_cart(&self, caller: &CallerContext) -> Result<(), GatewayError>;
}

#[async_trait]
impl<T: CartGateway + ?Sized> CartGateway for Arc<T> {
    async fn get_cart(&self, caller: &CallerContext) -> Result<Option<CartSnapshot>, GatewayError> {
        (**self).get_cart(caller).await
    }

    async fn clear_cart(&self, caller: &CallerContext) -> Result<(), GatewayError> {
        (**self).clear_cart(caller).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, CartSnapshot>,
    fail_on_get: bool,
    fail_on_clear: bool,
    get_calls: usize,
    clear_calls: usize,
}

/// In-memory cart service for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartGateway {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cart of `user_id`.
    pub async fn set_cart(&self, user_id: impl Into<UserId>, items: Vec<CartLine>) {
        self.state
            .write()
            .await
            .carts
            .insert(user_id.into(), CartSnapshot::new(items));
    }

    pub async fn cart(&self, user_id: impl Into<UserId>) -> Option<CartSnapshot> {
        self.state.read().await.carts.get(&user_id.into()).cloned()
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    pub async fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().await.fail_on_clear = fail;
    }

    pub async fn get_calls(&self) -> usize {
        self.state.read().await.get_calls
    }

    pub async fn clear_calls(&self) -> usize {
        self.state.read().await.clear_calls
    }
}

#[async_trait]
impl CartGateway for InMemoryCartGateway {
    async fn get_cart(&self, caller: &CallerContext) -> Result<Option<CartSnapshot>, GatewayError> {
        let mut state = self.state.write().await;
        state.get_calls += 1;
        if state.fail_on_get {
            return Err(GatewayError::Unavailable("cart service".to_string()));
        }
        Ok(state.carts.get(&caller.user_id).cloned())
    }

    async fn clear_cart(&self, caller: &CallerContext) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.clear_calls += 1;
        if state.fail_on_clear {
            return Err(GatewayError::Unavailable("cart service".to_string()));
        }
        state.carts.remove(&caller.user_id);
        Ok(())
    }
}
