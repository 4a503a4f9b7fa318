//! Administrative order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{OrderId, Page, PageRequest, SortDirection, UserId};
use domain::{Money, Order, OrderFilter, OrderRepository, OrderStatus, OrderStatusLog};
use serde::{Deserialize, Serialize};

use super::orders::{AppState, OrderResponse};
use crate::error::ApiError;
use crate::identity::Admin;

const DEFAULT_ADMIN_PAGE_SIZE: u32 = 20;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub status: Option<String>,
    pub user_id: Option<i64>,
    /// `asc`, `desc`, or `<field>,<direction>`.
    pub sort: Option<String>,
}

impl AdminListQuery {
    fn filter(&self) -> OrderFilter {
        let mut filter = OrderFilter::all();
        if let Some(raw) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            match raw.parse::<OrderStatus>() {
                Ok(status) => filter = filter.with_status(status),
                Err(_) => tracing::warn!(status = raw, "ignoring unknown status filter"),
            }
        }
        if let Some(user_id) = self.user_id {
            filter = filter.with_user(UserId::new(user_id));
        }
        filter
    }

    fn page_request(&self) -> PageRequest {
        let direction = match self.sort.as_deref() {
            None => SortDirection::Desc,
            Some(raw) => {
                let dir = raw.rsplit(',').next().unwrap_or(raw);
                SortDirection::parse(dir).unwrap_or_else(|| {
                    tracing::warn!(sort = raw, "ignoring unknown sort, using newest first");
                    SortDirection::Desc
                })
            }
        };
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_ADMIN_PAGE_SIZE),
        )
        .with_direction(direction)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub new_status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub id: Option<i64>,
    pub user_id: i64,
    pub customer_email: String,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: Money,
    pub status: String,
    pub item_count: usize,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map(|id| id.as_i64()),
            user_id: order.user_id().as_i64(),
            customer_email: order.customer_email().to_string(),
            customer_name: order.customer_name().to_string(),
            order_date: order.created_at(),
            total_amount: order.total_amount(),
            status: order.status().to_string(),
            item_count: order.items().len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusLogResponse {
    pub id: Option<i64>,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
    pub notes: Option<String>,
}

impl From<&OrderStatusLog> for StatusLogResponse {
    fn from(log: &OrderStatusLog) -> Self {
        Self {
            id: log.id,
            previous_status: log.previous_status.map(|s| s.to_string()),
            new_status: log.new_status.to_string(),
            changed_at: log.changed_at,
            changed_by: log.changed_by.clone(),
            notes: log.notes.clone(),
        }
    }
}

/// Full order with its status history, oldest entry first.
#[derive(Debug, Serialize)]
pub struct AdminOrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub status_history: Vec<StatusLogResponse>,
}

impl From<&Order> for AdminOrderDetailResponse {
    fn from(order: &Order) -> Self {
        Self {
            order: OrderResponse::from(order),
            status_history: order
                .status_logs()
                .iter()
                .map(StatusLogResponse::from)
                .collect(),
        }
    }
}

// -- Handlers --

/// GET /admin/orders: every order, filtered and paged.
#[tracing::instrument(skip(state))]
pub async fn list<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<Page<OrderSummaryResponse>>, ApiError> {
    let page = state
        .order_service
        .list_orders(query.filter(), query.page_request())
        .await?;

    Ok(Json(page.map(|order| OrderSummaryResponse::from(&order))))
}

/// GET /admin/orders/{id}: order detail including status history.
#[tracing::instrument(skip(state))]
pub async fn get<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<i64>,
) -> Result<Json<AdminOrderDetailResponse>, ApiError> {
    let order = state.order_service.get_order(OrderId::new(id)).await?;
    Ok(Json(AdminOrderDetailResponse::from(&order)))
}

/// PUT /admin/orders/{id}/status: move the order to a new status.
#[tracing::instrument(skip(state, payload), fields(admin = %admin.0))]
pub async fn update_status<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    admin: Admin,
    Path(id): Path<i64>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<AdminOrderDetailResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let notes = req.notes.filter(|n| !n.trim().is_empty());

    let order = state
        .order_service
        .transition_with_note(OrderId::new(id), &req.new_status, &admin.0, notes)
        .await?;

    Ok(Json(AdminOrderDetailResponse::from(&order)))
}

/// POST /admin/orders/{id}/notes: append an admin note without changing status.
#[tracing::instrument(skip(state, payload), fields(admin = %admin.0))]
pub async fn add_note<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    admin: Admin,
    Path(id): Path<i64>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<AdminOrderDetailResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let order = state
        .order_service
        .add_note(OrderId::new(id), &req.note, &admin.0)
        .await?;

    Ok(Json(AdminOrderDetailResponse::from(&order)))
}
