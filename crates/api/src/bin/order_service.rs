//! Order service entry point.

use std::sync::Arc;

use api::config::{Config, Service};
use api::routes::orders::OrderState;
use api::server::{self, BoxError};
use saga::{HttpInventoryClient, Instrumented, OrderSaga, SagaConfig};
use store::{InMemoryOrderStore, PostgresOrderStore};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Configuration, tracing and metrics
    let config = Config::from_env(Service::Order);
    server::init_tracing(&config);
    let metrics_handle = server::install_metrics()?;

    // 2. Collaborators
    let inventory = HttpInventoryClient::new(config.inventory_service_url.clone())?;
    let saga_config = SagaConfig {
        timeout: config.request_timeout,
        compensation_timeout: config.compensation_timeout,
    };
    tracing::info!(inventory = %config.inventory_service_url, ?saga_config, "order saga configured");

    // 3. Order store: PostgreSQL when configured, in-memory otherwise
    let state: OrderState = match server::connect_database(&config).await? {
        Some(pool) => Arc::new(Instrumented::new(OrderSaga::with_config(
            inventory,
            PostgresOrderStore::new(pool),
            saga_config,
        ))),
        None => Arc::new(Instrumented::new(OrderSaga::with_config(
            inventory,
            InMemoryOrderStore::new(),
            saga_config,
        ))),
    };

    // 4. Serve
    let app = api::create_order_app(state, metrics_handle);
    server::serve(&config, app).await
}
