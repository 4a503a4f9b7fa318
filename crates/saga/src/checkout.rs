//! Order checkout saga: context and steps.
//!
//! Steps run in this order:
//! 1. Fetch the caller's cart
//! 2. Fetch authoritative price and stock for every variant in one call
//! 3. Validate and price each cart line
//! 4. Persist the order (compensation: mark it `Failed`)
//! 5. Commit the new stock levels
//! 6. Clear the cart (failure is logged and ignored)

use std::collections::HashMap;

use async_trait::async_trait;
use common::{OrderId, VariantId};
use domain::{
    CheckoutDetails, DomainError, Order, OrderError, OrderItem, OrderRepository, OrderService,
    OrderStatus, SYSTEM_ACTOR,
};

use crate::error::SagaError;
use crate::services::{CallerContext, CartGateway, CartSnapshot, CatalogGateway, VariantPriceStock};
use crate::step::{OnFailure, SagaStep};

/// The saga type identifier for checkout.
pub const SAGA_TYPE: &str = "OrderCheckout";

pub const STEP_FETCH_CART: &str = "fetch_cart";
pub const STEP_FETCH_CATALOG: &str = "fetch_catalog";
pub const STEP_PRICE_LINES: &str = "price_lines";
pub const STEP_PERSIST_ORDER: &str = "persist_order";
pub const STEP_COMMIT_STOCK: &str = "commit_stock";
pub const STEP_CLEAR_CART: &str = "clear_cart";

/// An order line together with the stock level to write once the order is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub item: OrderItem,
    pub stock_after: i32,
}

/// State shared between checkout steps.
#[derive(Debug)]
pub struct CheckoutContext {
    pub caller: CallerContext,
    pub details: CheckoutDetails,
    pub cart: Option<CartSnapshot>,
    pub variants: HashMap<VariantId, VariantPriceStock>,
    pub lines: Vec<PricedLine>,
    pub order: Option<Order>,
    /// Variants whose stock has been written.
    pub committed: Vec<VariantId>,
}

impl CheckoutContext {
    pub fn new(caller: CallerContext, details: CheckoutDetails) -> Self {
        Self {
            caller,
            details,
            cart: None,
            variants: HashMap::new(),
            lines: Vec::new(),
            order: None,
            committed: Vec::new(),
        }
    }

    fn order_id(&self) -> Option<OrderId> {
        self.order.as_ref().and_then(Order::id)
    }
}

/// Loads the caller's cart.
pub struct FetchCart<'a, K> {
    pub cart: &'a K,
}

#[async_trait]
impl<K: CartGateway> SagaStep<CheckoutContext> for FetchCart<'_, K> {
    fn name(&self) -> &'static str {
        STEP_FETCH_CART
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        let cart = self
            .cart
            .get_cart(&ctx.caller)
            .await
            .map_err(SagaError::CartUnavailable)?
            .filter(|cart| !cart.is_empty())
            .ok_or(SagaError::EmptyCart {
                user_id: ctx.caller.user_id,
            })?;

        tracing::debug!(lines = cart.items.len(), "cart fetched");
        ctx.cart = Some(cart);
        Ok(())
    }
}

/// Fetches price and stock for the distinct variants in the cart.
pub struct FetchCatalog<'a, C> {
    pub catalog: &'a C,
}

#[async_trait]
impl<C: CatalogGateway> SagaStep<CheckoutContext> for FetchCatalog<'_, C> {
    fn name(&self) -> &'static str {
        STEP_FETCH_CATALOG
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        let cart = ctx.cart.as_ref().ok_or(SagaError::MissingStepOutput("cart"))?;

        let mut ids: Vec<VariantId> = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            if !ids.contains(&line.variant_id) {
                ids.push(line.variant_id);
            }
        }

        let variants = self
            .catalog
            .get_variants(&ctx.caller, &ids)
            .await
            .map_err(SagaError::CatalogUnavailable)?;

        ctx.variants = variants.into_iter().map(|v| (v.id, v)).collect();
        Ok(())
    }
}

/// Checks availability and prices every line at the catalog price.
///
/// Lines for the same variant draw from one running stock count.
pub struct PriceLines;

#[async_trait]
impl SagaStep<CheckoutContext> for PriceLines {
    fn name(&self) -> &'static str {
        STEP_PRICE_LINES
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        let cart = ctx.cart.as_ref().ok_or(SagaError::MissingStepOutput("cart"))?;
        let mut remaining: HashMap<VariantId, i32> = HashMap::new();
        let mut lines = Vec::with_capacity(cart.items.len());

        for line in &cart.items {
            let quantity = u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or(OrderError::InvalidQuantity {
                    variant_id: line.variant_id,
                    quantity: i64::from(line.quantity),
                })?;

            let variant = ctx
                .variants
                .get(&line.variant_id)
                .ok_or(SagaError::ProductUnavailable {
                    variant_id: line.variant_id,
                })?;

            let available = remaining
                .entry(line.variant_id)
                .or_insert(variant.stock_quantity);
            if line.quantity > *available {
                return Err(SagaError::InsufficientStock {
                    variant_id: line.variant_id,
                    product_name: variant.product_name.clone(),
                    requested: line.quantity,
                    available: (*available).max(0),
                });
            }
            *available -= line.quantity;

            let mut item = OrderItem::new(
                variant.id,
                variant.product_name.clone(),
                quantity,
                variant.price.rounded(),
            );
            item.variant_size = variant.size.clone();
            item.product_image_url = variant.image_url.clone();

            lines.push(PricedLine {
                item,
                stock_after: *available,
            });
        }

        ctx.lines = lines;
        Ok(())
    }
}

/// Stores the order. This is the commit point of the checkout.
pub struct PersistOrder<'a, R> {
    pub orders: &'a OrderService<R>,
}

#[async_trait]
impl<R: OrderRepository> SagaStep<CheckoutContext> for PersistOrder<'_, R> {
    fn name(&self) -> &'static str {
        STEP_PERSIST_ORDER
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        let items = ctx.lines.iter().map(|line| line.item.clone()).collect();
        let order = Order::place(ctx.caller.user_id, &ctx.details, items)?;
        let saved = self
            .orders
            .repository()
            .save(order)
            .await
            .map_err(DomainError::from)?;

        tracing::info!(
            order_id = ?saved.id(),
            total = %saved.total_amount(),
            "order persisted"
        );
        ctx.order = Some(saved);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut CheckoutContext, cause: &SagaError) -> Result<(), SagaError> {
        let Some(order_id) = ctx.order_id() else {
            return Ok(());
        };
        let failed = self
            .orders
            .transition_to(
                order_id,
                OrderStatus::Failed,
                SYSTEM_ACTOR,
                Some(format!("Order creation failed: {cause}")),
            )
            .await?;

        tracing::warn!(%order_id, "order marked failed");
        ctx.order = Some(failed);
        Ok(())
    }
}

/// Writes the reduced stock level for every line, stopping at the first failure.
pub struct CommitStock<'a, C> {
    pub catalog: &'a C,
}

#[async_trait]
impl<C: CatalogGateway> SagaStep<CheckoutContext> for CommitStock<'_, C> {
    fn name(&self) -> &'static str {
        STEP_COMMIT_STOCK
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        let order_id = ctx.order_id().ok_or(SagaError::MissingStepOutput("order"))?;

        for line in &ctx.lines {
            let variant_id = line.item.variant_id;
            if let Err(e) = self
                .catalog
                .set_stock(&ctx.caller, variant_id, line.stock_after)
                .await
            {
                metrics::counter!("stock_commit_failures_total").increment(1);
                tracing::error!(
                    %order_id,
                    %variant_id,
                    error = %e,
                    "stock commit failed, order needs reconciliation"
                );
                return Err(SagaError::StockCommitFailed {
                    order_id,
                    variant_id,
                    reason: e.to_string(),
                });
            }
            ctx.committed.push(variant_id);
        }
        Ok(())
    }
}

/// Empties the caller's cart. The order stands even if this fails.
pub struct ClearCart<'a, K> {
    pub cart: &'a K,
}

#[async_trait]
impl<K: CartGateway> SagaStep<CheckoutContext> for ClearCart<'_, K> {
    fn name(&self) -> &'static str {
        STEP_CLEAR_CART
    }

    fn on_failure(&self) -> OnFailure {
        OnFailure::Continue
    }

    async fn execute(&self, ctx: &mut CheckoutContext) -> Result<(), SagaError> {
        self.cart.clear_cart(&ctx.caller).await.map_err(|e| {
            metrics::counter!("cart_clear_failures_total").increment(1);
            SagaError::CartUnavailable(e)
        })
    }
}
