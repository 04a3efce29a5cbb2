//! The order service's use-case surface and its instrumentation wrapper.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Order, OrderStore};

use crate::coordinator::OrderSaga;
use crate::error::SagaError;
use crate::services::inventory::InventoryClient;

/// Everything the order service's inbound layer can ask for.
#[async_trait]
pub trait OrderUseCase: Send + Sync {
    async fn create_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, SagaError>;

    async fn get_all_orders(&self) -> Result<Vec<Order>, SagaError>;

    async fn pay_order(&self, id: OrderId) -> Result<Order, SagaError>;

    async fn complete_order(&self, id: OrderId) -> Result<Order, SagaError>;

    async fn cancel_order(&self, id: OrderId) -> Result<Order, SagaError>;
}

#[async_trait]
impl<I, S> OrderUseCase for OrderSaga<I, S>
where
    I: InventoryClient + 'static,
    S: OrderStore + 'static,
{
    async fn create_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        OrderSaga::create_order(self, user_id, product_id, quantity).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, SagaError> {
        OrderSaga::get_order(self, id).await
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>, SagaError> {
        OrderSaga::get_all_orders(self).await
    }

    async fn pay_order(&self, id: OrderId) -> Result<Order, SagaError> {
        OrderSaga::pay_order(self, id).await
    }

    async fn complete_order(&self, id: OrderId) -> Result<Order, SagaError> {
        OrderSaga::complete_order(self, id).await
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order, SagaError> {
        OrderSaga::cancel_order(self, id).await
    }
}

#[async_trait]
impl<U: OrderUseCase + ?Sized> OrderUseCase for Arc<U> {
    async fn create_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        (**self).create_order(user_id, product_id, quantity).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, SagaError> {
        (**self).get_order(id).await
    }

    async fn get_all_orders(&self) -> Result<Vec<Order>, SagaError> {
        (**self).get_all_orders().await
    }

    async fn pay_order(&self, id: OrderId) -> Result<Order, SagaError> {
        (**self).pay_order(id).await
    }

    async fn complete_order(&self, id: OrderId) -> Result<Order, SagaError> {
        (**self).complete_order(id).await
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order, SagaError> {
        (**self).cancel_order(id).await
    }
}

/// Wraps an [`OrderUseCase`] with a span per call plus call and latency
/// metrics, without changing what the inner use case does.
#[derive(Debug, Clone)]
pub struct Instrumented<U> {
    inner: U,
}

impl<U: OrderUseCase> Instrumented<U> {
    pub fn new(inner: U) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &U {
        &self.inner
    }

    async fn observe<T>(
        operation: &'static str,
        fut: impl Future<Output = Result<T, SagaError>>,
    ) -> Result<T, SagaError> {
        let start = std::time::Instant::now();
        let result = fut.await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::counter!("usecase_calls_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("usecase_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            tracing::debug!(operation, error = %e, "use case failed");
        }
        result
    }
}

#[async_trait]
impl<U: OrderUseCase> OrderUseCase for Instrumented<U> {
    #[tracing::instrument(name = "usecase.create_order", skip(self))]
    async fn create_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        Self::observe(
            "create_order",
            self.inner.create_order(user_id, product_id, quantity),
        )
        .await
    }

    #[tracing::instrument(name = "usecase.get_order", skip(self))]
    async fn get_order(&self, id: OrderId) -> Result<Order, SagaError> {
        Self::observe("get_order", self.inner.get_order(id)).await
    }

    #[tracing::instrument(name = "usecase.get_all_orders", skip(self))]
    async fn get_all_orders(&self) -> Result<Vec<Order>, SagaError> {
        Self::observe("get_all_orders", self.inner.get_all_orders()).await
    }

    #[tracing::instrument(name = "usecase.pay_order", skip(self))]
    async fn pay_order(&self, id: OrderId) -> Result<Order, SagaError> {
        Self::observe("pay_order", self.inner.pay_order(id)).await
    }

    #[tracing::instrument(name = "usecase.complete_order", skip(self))]
    async fn complete_order(&self, id: OrderId) -> Result<Order, SagaError> {
        Self::observe("complete_order", self.inner.complete_order(id)).await
    }

    #[tracing::instrument(name = "usecase.cancel_order", skip(self))]
    async fn cancel_order(&self, id: OrderId) -> Result<Order, SagaError> {
        Self::observe("cancel_order", self.inner.cancel_order(id)).await
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use domain::ProductView;
    use store::InMemoryOrderStore;

    use super::*;
    use crate::services::inventory::InMemoryInventoryClient;

    #[tokio::test]
    async fn test_instrumented_preserves_results() {
        let inventory = InMemoryInventoryClient::new();
        inventory
            .add_product(
                ProductView {
                    id: ProductId::new(1),
                    name: "Widget".to_string(),
                    price: Money::from_f64(2.5),
                },
                1,
            )
            .await;
        let usecase = Instrumented::new(OrderSaga::new(inventory, InMemoryOrderStore::new()));

        let order = usecase
            .create_order(UserId::new(1), ProductId::new(1), 1)
            .await
            .unwrap();
        assert_eq!(order.total_price(), Money::from_f64(2.5));

        let err = usecase
            .create_order(UserId::new(1), ProductId::new(1), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_stock");

        assert_eq!(usecase.get_all_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let saga = OrderSaga::new(InMemoryInventoryClient::new(), InMemoryOrderStore::new());
        let usecase: Arc<dyn OrderUseCase> = Arc::new(Instrumented::new(saga));

        assert_eq!(
            usecase.get_order(OrderId::new(1)).await.unwrap_err(),
            SagaError::OrderNotFound(OrderId::new(1))
        );
    }
}
