//! HTTP clients for the cart and catalog services.

use std::time::Duration;

use async_trait::async_trait;
use common::VariantId;
use domain::Money;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    CallerContext, CartGateway, CartLine, CartSnapshot, CatalogGateway, StockLevel,
    VariantPriceStock,
};
use crate::error::GatewayError;

const CART_SERVICE: &str = "cart";
const CATALOG_SERVICE: &str = "catalog";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartDto {
    #[serde(default)]
    items: Vec<CartItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemDto {
    product_variant_id: i64,
    quantity: i32,
    #[serde(default)]
    unit_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantDto {
    id: i64,
    #[serde(default)]
    size: Option<String>,
    stock_quantity: i32,
    product_name: String,
    product_price: Money,
    #[serde(default)]
    product_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockDto {
    stock_quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StockResponseDto {
    id: i64,
    stock_quantity: i32,
}

impl From<CartDto> for CartSnapshot {
    fn from(dto: CartDto) -> Self {
        CartSnapshot::new(
            dto.items
                .into_iter()
                .map(|item| CartLine {
                    variant_id: VariantId::new(item.product_variant_id),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        )
    }
}

impl From<VariantDto> for VariantPriceStock {
    fn from(dto: VariantDto) -> Self {
        VariantPriceStock {
            id: VariantId::new(dto.id),
            product_name: dto.product_name,
            price: dto.product_price,
            stock_quantity: dto.stock_quantity,
            size: dto.size,
            image_url: dto.product_image_url,
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, GatewayError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn authorize(request: RequestBuilder, caller: &CallerContext) -> RequestBuilder {
    match &caller.authorization {
        Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
        None => request,
    }
}

async fn ensure_success(service: &'static str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(service, status = status.as_u16(), body = %body, "downstream call failed");
    Err(GatewayError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(service: &'static str, response: Response) -> Result<T, GatewayError> {
    response.json().await.map_err(|e| GatewayError::Decode {
        service,
        message: e.to_string(),
    })
}

/// Cart service client. Operates on the caller's own cart at `/carts/mine`.
#[derive(Debug, Clone)]
pub struct HttpCartGateway {
    http: Client,
    base_url: String,
}

impl HttpCartGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/carts/mine", self.base_url)
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn get_cart(&self, caller: &CallerContext) -> Result<Option<CartSnapshot>, GatewayError> {
        let url = self.url();
        debug!(url = %url, user_id = %caller.user_id, "fetching cart");

        let response = authorize(self.http.get(&url), caller)
            .header("X-User-Id", caller.user_id.to_string())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(CART_SERVICE, response).await?;
        let cart: CartDto = decode(CART_SERVICE, response).await?;
        Ok(Some(cart.into()))
    }

    async fn clear_cart(&self, caller: &CallerContext) -> Result<(), GatewayError> {
        let url = self.url();
        debug!(url = %url, user_id = %caller.user_id, "clearing cart");

        let response = authorize(self.http.delete(&url), caller)
            .header("X-User-Id", caller.user_id.to_string())
            .send()
            .await?;
        ensure_success(CART_SERVICE, response).await?;
        Ok(())
    }
}

/// Product catalog client.
#[derive(Debug, Clone)]
pub struct HttpCatalogGateway {
    http: Client,
    base_url: String,
}

impl HttpCatalogGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalogGateway {
    async fn get_variants(
        &self,
        caller: &CallerContext,
        ids: &[VariantId],
    ) -> Result<Vec<VariantPriceStock>, GatewayError> {
        let url = format!("{}/products/variants/findByIds", self.base_url);
        let body: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        debug!(url = %url, count = body.len(), "fetching variants");

        let response = authorize(self.http.post(&url), caller)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(CATALOG_SERVICE, response).await?;
        let variants: Vec<VariantDto> = decode(CATALOG_SERVICE, response).await?;
        Ok(variants.into_iter().map(VariantPriceStock::from).collect())
    }

    async fn set_stock(
        &self,
        caller: &CallerContext,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<StockLevel, GatewayError> {
        let url = format!("{}/products/variants/{}/stock", self.base_url, variant_id);
        debug!(url = %url, quantity, "updating stock");

        let response = authorize(self.http.put(&url), caller)
            .json(&StockDto {
                stock_quantity: quantity,
            })
            .send()
            .await?;
        let response = ensure_success(CATALOG_SERVICE, response).await?;
        let level: StockResponseDto = decode(CATALOG_SERVICE, response).await?;
        Ok(StockLevel {
            id: VariantId::new(level.id),
            stock_quantity: level.stock_quantity,
        })
    }
}
