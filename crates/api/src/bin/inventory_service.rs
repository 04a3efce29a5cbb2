//! Inventory service entry point.

use std::sync::Arc;

use api::config::{Config, Service};
use api::server::{self, BoxError};
use domain::{ProductService, ProductStore};
use store::{InMemoryProductStore, PostgresProductStore};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env(Service::Inventory);
    server::init_tracing(&config);
    let metrics_handle = server::install_metrics()?;

    let product_store: Arc<dyn ProductStore> = match server::connect_database(&config).await? {
        Some(pool) => Arc::new(PostgresProductStore::new(pool)),
        None => Arc::new(InMemoryProductStore::new()),
    };
    let products = Arc::new(ProductService::new(product_store, config.request_timeout));

    let app = api::create_inventory_app(products, metrics_handle);
    server::serve(&config, app).await
}
