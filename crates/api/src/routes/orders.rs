//! Order service endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use domain::{Order, OrderStatus, PaymentStatus};
use saga::OrderUseCase;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::error::ApiError;

/// Shared state of the order service.
pub type OrderState = Arc<dyn OrderUseCase>;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub total_price: Money,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().map_or(0, |id| id.as_i64()),
            user_id: order.user_id(),
            product_id: order.product_id(),
            product_name: order.product_name().to_string(),
            unit_price: order.unit_price(),
            quantity: order.quantity(),
            total_price: order.total_price(),
            order_status: order.order_status(),
            payment_status: order.payment_status(),
            created_at: order.created_at(),
        }
    }
}

// -- Handlers --

/// POST /orders: run the order-creation saga.
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<OrderState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if req.quantity <= 0 {
        return Err(ApiError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let order = state
        .create_order(req.user_id, req.product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<OrderState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.get_order(parse_id::<OrderId>(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<OrderState>) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.get_all_orders().await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// POST /orders/{id}/pay
#[tracing::instrument(skip(state))]
pub async fn pay(
    State(state): State<OrderState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.pay_order(parse_id::<OrderId>(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/complete: complete a paid order and settle its stock.
#[tracing::instrument(skip(state))]
pub async fn complete(
    State(state): State<OrderState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.complete_order(parse_id::<OrderId>(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel: cancel an order and return its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<OrderState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.cancel_order(parse_id::<OrderId>(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}
