//! Gateways to the cart and product catalog services.

pub mod cart;
pub mod catalog;
pub mod http;

use common::UserId;

pub use cart::{CartGateway, CartLine, CartSnapshot, InMemoryCartGateway};
pub use catalog::{CatalogGateway, InMemoryCatalogGateway, StockLevel, VariantPriceStock};
pub use http::{HttpCartGateway, HttpCatalogGateway};

/// Identity of the caller on whose behalf a gateway call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: UserId,
    /// Raw `Authorization` header value, forwarded verbatim downstream.
    pub authorization: Option<String>,
}

impl CallerContext {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}
