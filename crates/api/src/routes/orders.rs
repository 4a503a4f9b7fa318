//! Customer order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Page, PageRequest};
use domain::{
    Address, CheckoutDetails, Money, Order, OrderItem, OrderRepository, OrderService,
};
use saga::{CartGateway, CatalogGateway, CheckoutCoordinator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::identity::Caller;

/// Checkout coordinator with boxed gateways so the binary can pick HTTP or
/// in-memory implementations at runtime.
pub type Checkout<R> =
    CheckoutCoordinator<R, Arc<dyn CartGateway>, Arc<dyn CatalogGateway>>;

/// Shared application state accessible from all handlers.
pub struct AppState<R: OrderRepository> {
    pub order_service: OrderService<R>,
    pub checkout: Checkout<R>,
}

const DEFAULT_CUSTOMER_PAGE_SIZE: u32 = 10;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Option<i64>,
    pub product_variant_id: i64,
    pub product_name: String,
    pub variant_size: Option<String>,
    pub product_image_url: Option<String>,
    pub quantity: u32,
    pub price_at_purchase: Money,
    pub subtotal: Money,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id,
            product_variant_id: item.variant_id.as_i64(),
            product_name: item.product_name.clone(),
            variant_size: item.variant_size.clone(),
            product_image_url: item.product_image_url.clone(),
            quantity: item.quantity,
            price_at_purchase: item.unit_price,
            subtotal: item.line_total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Option<i64>,
    pub user_id: i64,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Money,
    pub customer_email: String,
    pub customer_name: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_method: String,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.as_i64()),
            user_id: order.user_id().as_i64(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            total_amount: order.total_amount(),
            customer_email: order.customer_email().to_string(),
            customer_name: order.customer_name().to_string(),
            shipping_address: order.shipping_address().clone(),
            billing_address: order.billing_address().clone(),
            payment_method: order.payment_method().to_string(),
            shipping_method: order.shipping_method().map(String::from),
            tracking_number: order.tracking_number().map(String::from),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            items: order.items().iter().map(OrderItemResponse::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: check out the caller's cart.
#[tracing::instrument(skip(state, caller, payload), fields(user_id = %caller.user_id()))]
pub async fn create<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    caller: Caller,
    payload: Result<Json<CheckoutDetails>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(details) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let order = state.checkout.create_order(caller.0, details).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/mine: the caller's orders, newest first.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id()))]
pub async fn list_mine<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    caller: Caller,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<OrderResponse>>, ApiError> {
    let request = PageRequest::new(
        query.page.unwrap_or(0),
        query.size.unwrap_or(DEFAULT_CUSTOMER_PAGE_SIZE),
    );
    let page = state
        .order_service
        .list_orders_for_user(caller.user_id(), request)
        .await?;

    Ok(Json(page.map(|order| OrderResponse::from(&order))))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user_id()))]
pub async fn get<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .get_order_for_user(id.into(), caller.user_id())
        .await?;

    Ok(Json(OrderResponse::from(&order)))
}
