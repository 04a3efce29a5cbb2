//! Concurrency tests for the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use common::{Money, ProductId};
use domain::{DomainError, NewProduct, ProductService, ProductStore, StoreError};
use futures_util::future::join_all;
use store::InMemoryProductStore;

async fn seeded(total_qty: i32) -> (InMemoryProductStore, ProductId) {
    let store = InMemoryProductStore::new();
    let product = store
        .create(NewProduct::new("W-1", "Widget", Money::from_f64(10.0), total_qty))
        .await
        .unwrap();
    (store, product.id())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reserves_for_last_unit_have_one_winner() {
    let (store, id) = seeded(1).await;
    let store = Arc::new(store);

    let attempts = (0..20).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.reserve_stock(id, 1).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::InsufficientStock { .. }))
    );

    let product = store.get_by_id(id).await.unwrap();
    assert_eq!(product.reserved_qty(), 1);
    assert_eq!(product.available_qty(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_reserve_and_release_keep_bounds() {
    let (store, id) = seeded(5).await;
    let store = Arc::new(store);

    let tasks = (0..50).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            if i % 2 == 0 {
                let _ = store.reserve_stock(id, 2).await;
            } else {
                let _ = store.release_stock(id, 1).await;
            }
            let product = store.get_by_id(id).await.unwrap();
            assert!(product.reserved_qty() >= 0);
            assert!(product.reserved_qty() <= product.total_qty());
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }
}

#[tokio::test]
async fn product_service_over_memory_store() {
    let (store, id) = seeded(4).await;
    let service = ProductService::new(store, Duration::from_secs(2));

    service.reserve_stock(id, 3).await.unwrap();
    assert!(matches!(
        service.reserve_stock(id, 2).await,
        Err(DomainError::Store(StoreError::InsufficientStock { .. }))
    ));

    service.confirm_stock(id, 2).await.unwrap();
    service.release_stock(id, 1).await.unwrap();

    let product = service.get_product(id).await.unwrap();
    assert_eq!(product.total_qty(), 2);
    assert_eq!(product.reserved_qty(), 0);

    assert!(matches!(
        service.release_stock(id, 1).await,
        Err(DomainError::Store(StoreError::InvariantViolation { .. }))
    ));
}

#[tokio::test]
async fn product_service_rejects_invalid_products() {
    let service = ProductService::new(InMemoryProductStore::new(), Duration::from_secs(2));

    let result = service
        .create_product(NewProduct::new("X", "", Money::from_f64(1.0), 1))
        .await;
    assert!(matches!(result, Err(DomainError::Product(_))));
    assert!(service.get_all_products().await.unwrap().is_empty());
}
