//! Saga coordinator for order creation and the order lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::{OrderId, ProductId, UserId};
use domain::{Order, OrderStatus, OrderStore, StatusPair, StoreError};
use tokio::time::Instant;
use tracing::Instrument;

use crate::error::SagaError;
use crate::order_creation;
use crate::services::inventory::InventoryClient;

/// Default deadline for one saga or lifecycle call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a compensating release, measured from when it starts.
pub const DEFAULT_COMPENSATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Time budgets for the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaConfig {
    /// Budget for a whole `create_order` call, and for each read or
    /// lifecycle call.
    pub timeout: Duration,
    /// Independent budget for each compensating release.
    pub compensation_timeout: Duration,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            compensation_timeout: DEFAULT_COMPENSATION_TIMEOUT,
        }
    }
}

/// Orchestrates order creation across the inventory service and the order
/// ledger.
///
/// Stock is reserved before the order is written, so a persisted order never
/// oversells. Any failure after the reservation releases it again before the
/// original error is returned. There are no retries: a failed step is final.
///
/// Inventory side effects that must not be lost (compensating releases, the
/// release on cancel, the deduction on completion) run on their own tasks, so
/// a caller that gives up mid-call does not cancel them.
pub struct OrderSaga<I, S>
where
    I: InventoryClient + 'static,
    S: OrderStore + 'static,
{
    inventory: Arc<I>,
    orders: Arc<S>,
    config: SagaConfig,
}

impl<I, S> OrderSaga<I, S>
where
    I: InventoryClient + 'static,
    S: OrderStore + 'static,
{
    /// Creates a new saga coordinator with default time budgets.
    pub fn new(inventory: I, orders: S) -> Self {
        Self::with_config(inventory, orders, SagaConfig::default())
    }

    pub fn with_config(inventory: I, orders: S, config: SagaConfig) -> Self {
        Self {
            inventory: Arc::new(inventory),
            orders: Arc::new(orders),
            config,
        }
    }

    pub fn config(&self) -> SagaConfig {
        self.config
    }

    /// Creates an order within the configured timeout.
    pub async fn create_order(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        let deadline = Instant::now() + self.config.timeout;
        self.create_order_until(deadline, user_id, product_id, quantity)
            .await
    }

    /// Creates an order, failing any step that has not finished by `deadline`.
    ///
    /// Steps: fetch the product snapshot, reserve stock, build the order from
    /// the snapshot, persist it. A failure in the last two steps releases the
    /// reservation under an independent deadline, then returns the failure.
    #[tracing::instrument(skip(self, deadline), fields(saga_type = "OrderCreation"))]
    pub async fn create_order_until(
        &self,
        deadline: Instant,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let result = self
            .run_create(deadline, user_id, product_id, quantity)
            .await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        match &result {
            Ok(order) => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(order_id = ?order.id(), duration, "order created");
            }
            Err(e) => {
                metrics::counter!("saga_failed", "kind" => e.kind()).increment(1);
                tracing::warn!(error = %e, duration, "order creation failed");
            }
        }
        result
    }

    async fn run_create(
        &self,
        deadline: Instant,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, SagaError> {
        let product = step(
            deadline,
            order_creation::STEP_GET_PRODUCT,
            self.inventory.get_product(product_id),
        )
        .await?;

        step(
            deadline,
            order_creation::STEP_RESERVE_STOCK,
            self.inventory.reserve_stock(product_id, quantity),
        )
        .await?;

        // From here on the reservation must be released unless the order is
        // persisted, including when this future is dropped.
        let reservation = Reservation::new(
            Arc::clone(&self.inventory),
            product_id,
            quantity,
            self.config.compensation_timeout,
        );

        let order = match Order::new(user_id, product_id, product.name, product.price, quantity) {
            Ok(order) => order,
            Err(e) => {
                reservation.compensate().await;
                return Err(e.into());
            }
        };

        match step(
            deadline,
            order_creation::STEP_PERSIST_ORDER,
            self.orders.create(order),
        )
        .await
        {
            Ok(order) => {
                reservation.keep();
                Ok(order)
            }
            Err(e) => {
                reservation.compensate().await;
                Err(e)
            }
        }
    }

    /// Loads an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, SagaError> {
        self.load(Instant::now() + self.config.timeout, id).await
    }

    /// Loads all orders, ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<Order>, SagaError> {
        step(
            Instant::now() + self.config.timeout,
            order_creation::STEP_LIST_ORDERS,
            self.orders.get_all(),
        )
        .await
    }

    /// Marks an order as paid.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(&self, id: OrderId) -> Result<Order, SagaError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut order = self.load(deadline, id).await?;
        let loaded = order.statuses();
        order.pay()?;
        self.save_status(deadline, id, loaded, &order).await?;
        tracing::info!(%id, "order paid");
        Ok(order)
    }

    /// Completes a paid order and deducts its reserved stock.
    ///
    /// The status is written first, conditional on the statuses just loaded,
    /// so of two concurrent completions only one deducts stock. If the
    /// inventory then refuses the deduction the status is put back.
    #[tracing::instrument(skip(self))]
    pub async fn complete_order(&self, id: OrderId) -> Result<Order, SagaError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut order = self.load(deadline, id).await?;
        let loaded = order.statuses();
        order.complete()?;
        self.save_status(deadline, id, loaded, &order).await?;

        let inventory = Arc::clone(&self.inventory);
        let orders = Arc::clone(&self.orders);
        let (product_id, quantity, completed) =
            (order.product_id(), order.quantity(), order.statuses());
        let revert_timeout = self.config.compensation_timeout;

        detached(async move {
            let confirmed = step(
                deadline,
                order_creation::STEP_CONFIRM_STOCK,
                inventory.confirm_stock(product_id, quantity),
            )
            .await;
            if let Err(e) = &confirmed {
                revert_status(&*orders, id, completed, loaded, revert_timeout, e).await;
            }
            confirmed
        })
        .await
        .unwrap_or_else(|| {
            Err(SagaError::InventoryService(
                "stock confirmation task failed".to_string(),
            ))
        })?;

        tracing::info!(%id, "order completed");
        Ok(order)
    }

    /// Cancels an order and returns its reserved stock.
    ///
    /// Only the call whose status write wins releases the stock; cancelling
    /// an already cancelled order changes nothing. The release is best effort
    /// and a failure is logged and counted like a saga compensation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, SagaError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut order = self.load(deadline, id).await?;
        if order.order_status() == OrderStatus::Cancelled {
            return Ok(order);
        }

        let loaded = order.statuses();
        order.cancel()?;
        self.save_status(deadline, id, loaded, &order).await?;

        detached(release_reservation(
            Arc::clone(&self.inventory),
            order.product_id(),
            order.quantity(),
            self.config.compensation_timeout,
            "cancel",
        ))
        .await;
        tracing::info!(%id, "order cancelled");
        Ok(order)
    }

    async fn load(&self, deadline: Instant, id: OrderId) -> Result<Order, SagaError> {
        step(
            deadline,
            order_creation::STEP_LOAD_ORDER,
            self.orders.get_by_id(id),
        )
        .await
        .map_err(|e| match e {
            SagaError::Store(StoreError::NotFound { .. }) => SagaError::OrderNotFound(id),
            other => other,
        })
    }

    /// Writes the order's statuses if the stored ones still equal `loaded`.
    async fn save_status(
        &self,
        deadline: Instant,
        id: OrderId,
        loaded: StatusPair,
        order: &Order,
    ) -> Result<(), SagaError> {
        step(
            deadline,
            order_creation::STEP_UPDATE_STATUS,
            self.orders.update_status(id, loaded, order.statuses()),
        )
        .await
        .map_err(|e| match e {
            SagaError::Store(StoreError::NotFound { .. }) => SagaError::OrderNotFound(id),
            SagaError::Store(StoreError::StatusConflict { .. }) => {
                tracing::warn!(%id, "order changed concurrently");
                SagaError::Conflict(id)
            }
            other => other,
        })
    }
}

/// Runs one saga step, failing with [`SagaError::Timeout`] at the deadline.
async fn step<T, E>(
    deadline: Instant,
    name: &'static str,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, SagaError>
where
    SagaError: From<E>,
{
    let timed_out = || {
        tracing::warn!(step = name, "saga step timed out");
        SagaError::Timeout { step: name }
    };

    // An expired deadline fails the step before it starts.
    if Instant::now() >= deadline {
        return Err(timed_out());
    }
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result.map_err(SagaError::from),
        Err(_) => Err(timed_out()),
    }
}

/// Runs `task` on its own tokio task and waits for its output.
///
/// If the caller's future is dropped while waiting, the task keeps running.
/// `None` means the task panicked.
async fn detached<F>(task: F) -> Option<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match tokio::spawn(task.in_current_span()).await {
        Ok(output) => Some(output),
        Err(e) => {
            tracing::error!(error = %e, "detached saga task failed");
            None
        }
    }
}

/// A stock reservation the saga still owns.
///
/// Dropping it without calling [`Reservation::keep`] or
/// [`Reservation::compensate`] spawns the release on the current runtime, so
/// a cancelled `create_order` future still gives the stock back.
struct Reservation<I: InventoryClient + 'static> {
    inventory: Option<Arc<I>>,
    product_id: ProductId,
    quantity: i32,
    timeout: Duration,
}

impl<I: InventoryClient + 'static> Reservation<I> {
    fn new(inventory: Arc<I>, product_id: ProductId, quantity: i32, timeout: Duration) -> Self {
        Self {
            inventory: Some(inventory),
            product_id,
            quantity,
            timeout,
        }
    }

    /// The order now holds the reservation.
    fn keep(mut self) {
        self.inventory = None;
    }

    /// Releases the reservation on a detached task and waits for it.
    async fn compensate(mut self) {
        if let Some(inventory) = self.inventory.take() {
            detached(release_reservation(
                inventory,
                self.product_id,
                self.quantity,
                self.timeout,
                "saga",
            ))
            .await;
        }
    }
}

impl<I: InventoryClient + 'static> Drop for Reservation<I> {
    fn drop(&mut self) {
        let Some(inventory) = self.inventory.take() else {
            return;
        };

        let (product_id, quantity, timeout) = (self.product_id, self.quantity, self.timeout);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(%product_id, quantity, "saga cancelled after reservation");
                handle.spawn(release_reservation(
                    inventory, product_id, quantity, timeout, "cancelled",
                ));
            }
            Err(_) => {
                metrics::counter!("saga_compensation_failures_total", "reason" => "cancelled")
                    .increment(1);
                tracing::error!(
                    alert = "inventory_leak",
                    %product_id,
                    quantity,
                    "no runtime to release reservation"
                );
            }
        }
    }
}

/// Puts an order's statuses back after the inventory refused to settle it.
async fn revert_status<S: OrderStore + ?Sized>(
    orders: &S,
    id: OrderId,
    from: StatusPair,
    to: StatusPair,
    timeout: Duration,
    cause: &SagaError,
) {
    match tokio::time::timeout(timeout, orders.update_status(id, from, to)).await {
        Ok(Ok(())) => tracing::warn!(%id, status = %to, cause = %cause, "order status reverted"),
        Ok(Err(e)) => tracing::error!(
            %id,
            error = %e,
            cause = %cause,
            "order marked completed but stock not deducted"
        ),
        Err(_) => tracing::error!(
            %id,
            cause = %cause,
            "order marked completed but stock not deducted: revert timed out"
        ),
    }
}

/// Releases reserved stock under its own deadline.
///
/// Never fails: a release that errors or times out leaves stock reserved with
/// no order holding it, which is logged as an inventory leak.
async fn release_reservation<I: InventoryClient + ?Sized>(
    inventory: Arc<I>,
    product_id: ProductId,
    quantity: i32,
    timeout: Duration,
    reason: &'static str,
) {
    metrics::counter!("saga_compensations_total", "reason" => reason).increment(1);
    tracing::warn!(%product_id, quantity, reason, "releasing reserved stock");

    let outcome = tokio::time::timeout(timeout, inventory.release_stock(product_id, quantity))
        .await
        .unwrap_or(Err(SagaError::Timeout {
            step: order_creation::STEP_RELEASE_STOCK,
        }));

    match outcome {
        Ok(()) => tracing::info!(%product_id, quantity, reason, "reserved stock released"),
        Err(e) => {
            metrics::counter!("saga_compensation_failures_total", "reason" => reason).increment(1);
            tracing::error!(
                alert = "inventory_leak",
                %product_id,
                quantity,
                reason,
                error = %e,
                "failed to release reserved stock"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use domain::{PaymentStatus, ProductView};
    use store::InMemoryOrderStore;

    use super::*;
    use crate::services::inventory::{InMemoryInventoryClient, StockRequest};

    const WIDGET: ProductId = ProductId::new(1);

    async fn setup(stock: i32) -> (
        OrderSaga<InMemoryInventoryClient, InMemoryOrderStore>,
        InMemoryInventoryClient,
        InMemoryOrderStore,
    ) {
        let inventory = InMemoryInventoryClient::new();
        inventory
            .add_product(
                ProductView {
                    id: WIDGET,
                    name: "Widget".to_string(),
                    price: Money::from_f64(19.99),
                },
                stock,
            )
            .await;
        let orders = InMemoryOrderStore::new();
        let saga = OrderSaga::new(inventory.clone(), orders.clone());
        (saga, inventory, orders)
    }

    #[tokio::test]
    async fn test_happy_path_snapshots_product() {
        let (saga, inventory, orders) = setup(10).await;

        let order = saga.create_order(UserId::new(7), WIDGET, 3).await.unwrap();

        assert_eq!(order.product_name(), "Widget");
        assert_eq!(order.unit_price(), Money::from_f64(19.99));
        assert_eq!(order.total_price(), Money::from_f64(59.97));
        assert_eq!(order.order_status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(inventory.reserve_calls().await.len(), 1);
        assert!(inventory.release_calls().await.is_empty());
        assert_eq!(inventory.stock(WIDGET).await, Some((10, 3)));
        assert_eq!(orders.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_persist_failure_releases_reservation() {
        let (saga, inventory, orders) = setup(10).await;
        orders.set_fail_on_create(true);

        let result = saga.create_order(UserId::new(7), WIDGET, 4).await;

        assert!(matches!(result, Err(SagaError::Store(StoreError::Internal(_)))));
        assert_eq!(
            inventory.release_calls().await,
            vec![StockRequest {
                product_id: WIDGET,
                quantity: 4
            }]
        );
        assert_eq!(inventory.stock(WIDGET).await, Some((10, 0)));
    }

    #[tokio::test]
    async fn test_invalid_user_releases_reservation() {
        let (saga, inventory, orders) = setup(10).await;

        let result = saga.create_order(UserId::new(0), WIDGET, 2).await;

        assert!(matches!(result, Err(SagaError::InvalidOrder(_))));
        assert_eq!(inventory.release_calls().await.len(), 1);
        assert_eq!(orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_has_nothing_to_compensate() {
        let (saga, inventory, _) = setup(1).await;

        let result = saga.create_order(UserId::new(7), WIDGET, 2).await;

        assert_eq!(
            result.unwrap_err(),
            SagaError::InsufficientStock {
                product_id: WIDGET,
                requested: 2
            }
        );
        assert!(inventory.release_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_never_reserves() {
        let (saga, inventory, _) = setup(1).await;

        let result = saga.create_order(UserId::new(7), ProductId::new(99), 1).await;

        assert_eq!(result.unwrap_err(), SagaError::ProductNotFound(ProductId::new(99)));
        assert!(inventory.reserve_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_compensation_failure_returns_original_error() {
        let (saga, inventory, orders) = setup(10).await;
        orders.set_fail_on_create(true);
        inventory.set_fail_on_release(true).await;

        let result = saga.create_order(UserId::new(7), WIDGET, 1).await;

        assert!(matches!(result, Err(SagaError::Store(_))));
        assert_eq!(inventory.release_calls().await.len(), 1);
        assert_eq!(inventory.stock(WIDGET).await, Some((10, 1)));
    }

    #[tokio::test]
    async fn test_lifecycle_pay_complete() {
        let (saga, inventory, _) = setup(10).await;
        let id = saga
            .create_order(UserId::new(7), WIDGET, 2)
            .await
            .unwrap()
            .id()
            .unwrap();

        let paid = saga.pay_order(id).await.unwrap();
        assert_eq!(paid.payment_status(), PaymentStatus::Paid);

        let completed = saga.complete_order(id).await.unwrap();
        assert_eq!(completed.order_status(), OrderStatus::Completed);
        assert_eq!(inventory.stock(WIDGET).await, Some((8, 0)));

        let stored = saga.get_order(id).await.unwrap();
        assert_eq!(stored.order_status(), OrderStatus::Completed);
        assert_eq!(stored.payment_status(), PaymentStatus::Paid);

        assert!(matches!(
            saga.cancel_order(id).await,
            Err(SagaError::InvalidOrder(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_once() {
        let (saga, inventory, _) = setup(10).await;
        let id = saga
            .create_order(UserId::new(7), WIDGET, 3)
            .await
            .unwrap()
            .id()
            .unwrap();

        saga.cancel_order(id).await.unwrap();
        saga.cancel_order(id).await.unwrap();

        assert_eq!(inventory.release_calls().await.len(), 1);
        assert_eq!(inventory.stock(WIDGET).await, Some((10, 0)));
        assert!(matches!(
            saga.pay_order(id).await,
            Err(SagaError::InvalidOrder(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_order() {
        let (saga, _, _) = setup(1).await;
        assert_eq!(
            saga.pay_order(OrderId::new(5)).await.unwrap_err(),
            SagaError::OrderNotFound(OrderId::new(5))
        );
        assert_eq!(
            saga.get_order(OrderId::new(5)).await.unwrap_err(),
            SagaError::OrderNotFound(OrderId::new(5))
        );
    }

    #[tokio::test]
    async fn test_complete_unpaid_order_touches_nothing() {
        let (saga, inventory, _) = setup(10).await;
        let id = saga
            .create_order(UserId::new(7), WIDGET, 2)
            .await
            .unwrap()
            .id()
            .unwrap();

        assert!(matches!(
            saga.complete_order(id).await,
            Err(SagaError::InvalidOrder(_))
        ));
        assert_eq!(inventory.stock(WIDGET).await, Some((10, 2)));
    }
}
