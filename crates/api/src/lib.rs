//! HTTP surfaces for the order and inventory services.
//!
//! Provides the two routers, with structured logging (tracing) and
//! Prometheus metrics, plus the startup helpers both binaries share.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::OrderState;
use routes::products::ProductState;

/// Creates the order service router.
pub fn create_order_app(state: OrderState, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/pay", post(routes::orders::pay))
        .route("/orders/{id}/complete", post(routes::orders::complete))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .with_state(state)
        .merge(routes::metrics::router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Creates the inventory service router.
pub fn create_inventory_app(state: ProductState, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", post(routes::products::create))
        .route("/products", get(routes::products::list))
        .route("/products/{id}", get(routes::products::get))
        .route("/products/reserve", post(routes::products::reserve))
        .route("/products/release", post(routes::products::release))
        .route("/products/confirm", post(routes::products::confirm))
        .with_state(state)
        .merge(routes::metrics::router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
