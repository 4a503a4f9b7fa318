//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use order_store::{InMemoryOrderRepository, PostgresOrderRepository};
use saga::{CartGateway, CatalogGateway, HttpCartGateway, HttpCatalogGateway};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Downstream gateways
    let cart: Arc<dyn CartGateway> = Arc::new(
        HttpCartGateway::new(&config.cart_service_url, config.gateway_timeout)
            .expect("failed to build cart client"),
    );
    let catalog: Arc<dyn CatalogGateway> = Arc::new(
        HttpCatalogGateway::new(&config.catalog_service_url, config.gateway_timeout)
            .expect("failed to build catalog client"),
    );
    tracing::info!(
        cart = %config.cart_service_url,
        catalog = %config.catalog_service_url,
        timeout_secs = config.gateway_timeout.as_secs(),
        "gateways configured"
    );

    // 4. Order store and application
    let app = match &config.database_url {
        Some(url) => {
            let repository = PostgresOrderRepository::connect(url, config.database_max_connections)
                .await
                .expect("failed to connect to PostgreSQL");
            repository
                .run_migrations()
                .await
                .expect("failed to run migrations");
            api::create_app(
                api::create_state(repository, cart, catalog),
                metrics_handle,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            api::create_app(
                api::create_state(InMemoryOrderRepository::new(), cart, catalog),
                metrics_handle,
            )
        }
    };

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
