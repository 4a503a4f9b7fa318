//! Catalog gateway trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::VariantId;
use domain::Money;
use tokio::sync::RwLock;

use super::CallerContext;
use crate::error::GatewayError;

/// Price and stock of one product variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPriceStock {
    pub id: VariantId,
    pub product_name: String,
    pub price: Money,
    pub stock_quantity: i32,
    pub size: Option<String>,
    pub image_url: Option<String>,
}

impl VariantPriceStock {
    pub fn new(
        id: impl Into<VariantId>,
        product_name: impl Into<String>,
        price: Money,
        stock_quantity: i32,
    ) -> Self {
        Self {
            id: id.into(),
            product_name: product_name.into(),
            price,
            stock_quantity,
            size: None,
            image_url: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Stock level reported back after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub id: VariantId,
    pub stock_quantity: i32,
}

/// Access to the product catalog service.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Looks up variants in one batched call. Unknown ids are omitted from
    /// the result.
    async fn get_variants(
        &self,
        caller: &CallerContext,
        ids: &[VariantId],
    ) -> Result<Vec<VariantPriceStock>, GatewayError>;

    /// Sets the absolute stock quantity of a variant.
    async fn set_stock(
        &self,
        caller: &CallerContext,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<StockLevel, GatewayError>;
}

#[async_trait]
impl<T: CatalogGateway + ?Sized> CatalogGateway for Arc<T> {
    async fn get_variants(
        &self,
        caller: &CallerContext,
        ids: &[VariantId],
    ) -> Result<Vec<VariantPriceStock>, GatewayError> {
        (**self).get_variants(caller, ids).await
    }

    async fn set_stock(
        &self,
        caller: &CallerContext,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<StockLevel, GatewayError> {
        (**self).set_stock(caller, variant_id, quantity).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    variants: HashMap<VariantId, VariantPriceStock>,
    fail_on_get: bool,
    fail_stock_for: HashSet<VariantId>,
    get_calls: usize,
    stock_updates: Vec<(VariantId, i32)>,
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogGateway {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a variant.
    pub async fn add_variant(&self, variant: VariantPriceStock) {
        self.state
            .write()
            .await
            .variants
            .insert(variant.id, variant);
    }

    pub async fn stock_of(&self, variant_id: impl Into<VariantId>) -> Option<i32> {
        self.state
            .read()
            .await
            .variants
            .get(&variant_id.into())
            .map(|v| v.stock_quantity)
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    /// Makes every `set_stock` for `variant_id` fail.
    pub async fn fail_set_stock_for(&self, variant_id: impl Into<VariantId>) {
        self.state
            .write()
            .await
            .fail_stock_for
            .insert(variant_id.into());
    }

    pub async fn get_calls(&self) -> usize {
        self.state.read().await.get_calls
    }

    /// Successful and attempted stock updates, in call order.
    pub async fn stock_updates(&self) -> Vec<(VariantId, i32)> {
        self.state.read().await.stock_updates.clone()
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalogGateway {
    async fn get_variants(
        &self,
        _caller: &CallerContext,
        ids: &[VariantId],
    ) -> Result<Vec<VariantPriceStock>, GatewayError> {
        let mut state = self.state.write().await;
        state.get_calls += 1;
        if state.fail_on_get {
            return Err(GatewayError::Unavailable("catalog service".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| state.variants.get(id).cloned())
            .collect())
    }

    async fn set_stock(
        &self,
        _caller: &CallerContext,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<StockLevel, GatewayError> {
        let mut state = self.state.write().await;
        state.stock_updates.push((variant_id, quantity));
        if state.fail_stock_for.contains(&variant_id) {
            return Err(GatewayError::Unavailable("catalog service".to_string()));
        }
        let variant = state
            .variants
            .get_mut(&variant_id)
            .ok_or_else(|| GatewayError::Status {
                service: "catalog",
                status: 404,
                body: format!("variant {variant_id} not found"),
            })?;
        variant.stock_quantity = quantity;
        Ok(StockLevel {
            id: variant_id,
            stock_quantity: quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_variants_omits_unknown() {
        let catalog = InMemoryCatalogGateway::new();
        catalog
            .add_variant(VariantPriceStock::new(1, "Mug", Money::from_cents(899), 4))
            .await;
        let caller = CallerContext::new(1);

        let found = catalog
            .get_variants(&caller, &[VariantId::new(1), VariantId::new(2)])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_name, "Mug");
        assert_eq!(catalog.get_calls().await, 1);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let catalog = InMemoryCatalogGateway::new();
        catalog
            .add_variant(VariantPriceStock::new(1, "Mug", Money::from_cents(899), 4))
            .await;
        let caller = CallerContext::new(1);

        let level = catalog.set_stock(&caller, VariantId::new(1), 1).await.unwrap();
        assert_eq!(level.stock_quantity, 1);
        assert_eq!(catalog.stock_of(1).await, Some(1));

        catalog.fail_set_stock_for(1).await;
        assert!(catalog.set_stock(&caller, VariantId::new(1), 0).await.is_err());
        assert_eq!(catalog.stock_of(1).await, Some(1));
        assert_eq!(catalog.stock_updates().await.len(), 2);
    }
}
