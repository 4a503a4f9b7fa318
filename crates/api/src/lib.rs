//! HTTP API for the order service.
//!
//! Customers check out their cart and read their own orders. Administrators
//! list orders, change their status and attach notes. Requests are traced and
//! metrics are exposed in Prometheus format.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{OrderRepository, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{CartGateway, CatalogGateway, CheckoutCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R: OrderRepository + 'static>(
    state: Arc<AppState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<R>))
        .route("/orders/mine", get(routes::orders::list_mine::<R>))
        .route("/orders/{id}", get(routes::orders::get::<R>))
        .route("/admin/orders", get(routes::admin::list::<R>))
        .route("/admin/orders/{id}", get(routes::admin::get::<R>))
        .route(
            "/admin/orders/{id}/status",
            put(routes::admin::update_status::<R>),
        )
        .route("/admin/orders/{id}/notes", post(routes::admin::add_note::<R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the order service and checkout coordinator around one repository.
pub fn create_state<R: OrderRepository + Clone + 'static>(
    repository: R,
    cart: Arc<dyn CartGateway>,
    catalog: Arc<dyn CatalogGateway>,
) -> Arc<AppState<R>> {
    let order_service = OrderService::new(repository.clone());
    let checkout = CheckoutCoordinator::new(OrderService::new(repository), cart, catalog);

    Arc::new(AppState {
        order_service,
        checkout,
    })
}
