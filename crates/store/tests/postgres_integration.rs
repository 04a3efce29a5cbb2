//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{Money, OrderId, ProductId, UserId};
use domain::{
    NewProduct, Order, OrderStatus, OrderStore, PaymentStatus, ProductStore, StatusPair,
    StockOperation, StoreError,
};
use futures_util::future::join_all;
use sqlx::PgPool;
use store::{PostgresOrderStore, PostgresProductStore};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_products_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_orders_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables and reset sequences
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn widget(total_qty: i32) -> NewProduct {
    NewProduct::new("W-1", "Widget", Money::from_f64(10.0), total_qty)
}

async fn stock_of(store: &PostgresProductStore, id: ProductId) -> (i32, i32) {
    let product = store.get_by_id(id).await.unwrap();
    (product.total_qty(), product.reserved_qty())
}

#[tokio::test]
async fn product_create_and_retrieve() {
    let store = PostgresProductStore::new(get_test_pool().await);

    let created = store
        .create(widget(5).with_description("blue"))
        .await
        .unwrap();
    assert_eq!(created.id(), ProductId::new(1));
    assert_eq!(created.reserved_qty(), 0);

    let loaded = store.get_by_id(created.id()).await.unwrap();
    assert_eq!(loaded.name(), "Widget");
    assert_eq!(loaded.description(), "blue");
    assert_eq!(loaded.price(), Money::from_f64(10.0));
    assert_eq!(loaded.total_qty(), 5);
    assert!(loaded.is_active());
}

#[tokio::test]
async fn product_not_found() {
    let store = PostgresProductStore::new(get_test_pool().await);

    assert_eq!(
        store.get_by_id(ProductId::new(42)).await.unwrap_err(),
        StoreError::product_not_found(42)
    );
}

#[tokio::test]
async fn get_all_products_ordered_by_id() {
    let store = PostgresProductStore::new(get_test_pool().await);
    store.create(widget(1)).await.unwrap();
    store
        .create(NewProduct::new("G-1", "Gadget", Money::from_f64(3.5), 2))
        .await
        .unwrap();

    let names: Vec<String> = store
        .get_all()
        .await
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["Widget", "Gadget"]);
}

#[tokio::test]
async fn reserve_release_confirm_cycle() {
    let store = PostgresProductStore::new(get_test_pool().await);
    let id = store.create(widget(10)).await.unwrap().id();

    store.reserve_stock(id, 4).await.unwrap();
    assert_eq!(stock_of(&store, id).await, (10, 4));

    store.release_stock(id, 1).await.unwrap();
    assert_eq!(stock_of(&store, id).await, (10, 3));

    store.confirm_stock(id, 3).await.unwrap();
    assert_eq!(stock_of(&store, id).await, (7, 0));
}

#[tokio::test]
async fn reserve_beyond_available_fails_without_change() {
    let store = PostgresProductStore::new(get_test_pool().await);
    let id = store.create(widget(3)).await.unwrap().id();
    store.reserve_stock(id, 2).await.unwrap();

    let result = store.reserve_stock(id, 2).await;
    assert_eq!(
        result,
        Err(StoreError::InsufficientStock {
            product_id: id,
            requested: 2,
        })
    );
    assert_eq!(stock_of(&store, id).await, (3, 2));
}

#[tokio::test]
async fn reserve_unknown_product_is_insufficient_stock() {
    let store = PostgresProductStore::new(get_test_pool().await);

    assert!(matches!(
        store.reserve_stock(ProductId::new(999), 1).await,
        Err(StoreError::InsufficientStock { .. })
    ));
}

#[tokio::test]
async fn release_or_confirm_more_than_reserved_is_invariant_violation() {
    let store = PostgresProductStore::new(get_test_pool().await);
    let id = store.create(widget(5)).await.unwrap().id();
    store.reserve_stock(id, 1).await.unwrap();

    assert!(matches!(
        store.release_stock(id, 2).await,
        Err(StoreError::InvariantViolation {
            operation: StockOperation::Release,
            ..
        })
    ));
    assert!(matches!(
        store.confirm_stock(id, 2).await,
        Err(StoreError::InvariantViolation {
            operation: StockOperation::Confirm,
            ..
        })
    ));
    assert_eq!(stock_of(&store, id).await, (5, 1));
}

#[tokio::test]
async fn concurrent_reserves_never_oversell() {
    let store = Arc::new(PostgresProductStore::new(get_test_pool().await));
    let id = store.create(widget(3)).await.unwrap().id();

    let attempts = (0..10).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.reserve_stock(id, 1).await })
    });
    let results = join_all(attempts).await;

    let succeeded = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(()))))
        .count();
    assert_eq!(succeeded, 3);
    assert_eq!(stock_of(&store, id).await, (3, 3));
}

#[tokio::test]
async fn order_create_assigns_identity() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    let order = Order::new(
        UserId::new(7),
        ProductId::new(1),
        "Widget",
        Money::from_f64(19.99),
        3,
    )
    .unwrap();

    let created = store.create(order).await.unwrap();
    assert_eq!(created.id(), Some(OrderId::new(1)));

    let loaded = store.get_by_id(OrderId::new(1)).await.unwrap();
    assert_eq!(loaded.user_id(), UserId::new(7));
    assert_eq!(loaded.product_name(), "Widget");
    assert_eq!(loaded.unit_price(), Money::from_f64(19.99));
    assert_eq!(loaded.total_price(), Money::from_f64(59.97));
    assert_eq!(loaded.order_status(), OrderStatus::Pending);
    assert_eq!(loaded.payment_status(), PaymentStatus::Pending);
}

#[tokio::test]
async fn order_update_status() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    let order = Order::new(
        UserId::new(1),
        ProductId::new(1),
        "Widget",
        Money::from_f64(1.0),
        1,
    )
    .unwrap();
    let id = store.create(order).await.unwrap().id().unwrap();
    let pending = StatusPair::new(OrderStatus::Pending, PaymentStatus::Pending);
    let paid = StatusPair::new(OrderStatus::Pending, PaymentStatus::Paid);

    store.update_status(id, pending, paid).await.unwrap();
    let loaded = store.get_by_id(id).await.unwrap();
    assert_eq!(loaded.payment_status(), PaymentStatus::Paid);

    // A writer that still expects the old statuses loses.
    assert_eq!(
        store.update_status(id, pending, paid).await,
        Err(StoreError::StatusConflict { id })
    );

    assert_eq!(
        store
            .update_status(
                OrderId::new(404),
                pending,
                StatusPair::new(OrderStatus::Cancelled, PaymentStatus::Pending),
            )
            .await,
        Err(StoreError::order_not_found(404))
    );
}

#[tokio::test]
async fn concurrent_status_updates_have_one_winner() {
    let store = Arc::new(PostgresOrderStore::new(get_test_pool().await));
    let order = Order::new(
        UserId::new(1),
        ProductId::new(1),
        "Widget",
        Money::from_f64(1.0),
        1,
    )
    .unwrap();
    let id = store.create(order).await.unwrap().id().unwrap();
    let pending = StatusPair::new(OrderStatus::Pending, PaymentStatus::Pending);
    let cancelled = StatusPair::new(OrderStatus::Cancelled, PaymentStatus::Pending);

    let attempts = (0..8).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.update_status(id, pending, cancelled).await })
    });
    let results = join_all(attempts).await;

    let won = results.iter().filter(|r| matches!(r, Ok(Ok(())))).count();
    let conflicted = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(StoreError::StatusConflict { .. }))))
        .count();
    assert_eq!((won, conflicted), (1, 7));
}

#[tokio::test]
async fn get_all_orders_ordered_by_id() {
    let store = PostgresOrderStore::new(get_test_pool().await);
    for quantity in 1..=3 {
        let order = Order::new(
            UserId::new(1),
            ProductId::new(1),
            "Widget",
            Money::from_f64(2.0),
            quantity,
        )
        .unwrap();
        store.create(order).await.unwrap();
    }

    let quantities: Vec<i32> = store
        .get_all()
        .await
        .unwrap()
        .iter()
        .map(|o| o.quantity())
        .collect();
    assert_eq!(quantities, vec![1, 2, 3]);
}

#[tokio::test]
async fn check_constraint_rejects_corrupt_stock() {
    let pool = get_test_pool().await;
    let store = PostgresProductStore::new(pool.clone());
    let id = store.create(widget(2)).await.unwrap().id();

    let result = sqlx::query("UPDATE products SET reserved_qty = 3 WHERE id = $1")
        .bind(id.as_i64())
        .execute(&pool)
        .await;
    assert!(result.is_err());
}
