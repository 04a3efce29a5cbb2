//! Inventory service endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use domain::{NewProduct, Product, ProductService, ProductStore};
use saga::StockRequest;
use serde::Serialize;

use super::parse_id;
use crate::error::ApiError;

/// Shared state of the inventory service.
pub type ProductState = Arc<ProductService<Arc<dyn ProductStore>>>;

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub total_qty: i32,
    pub reserved_qty: i32,
    pub available_qty: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id(),
            sku: product.sku().to_string(),
            name: product.name().to_string(),
            description: product.description().to_string(),
            price: product.price(),
            total_qty: product.total_qty(),
            reserved_qty: product.reserved_qty(),
            available_qty: product.available_qty(),
            is_active: product.is_active(),
            created_at: product.created_at(),
            updated_at: product.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub message: &'static str,
}

/// POST /products
#[tracing::instrument(skip(state, req), fields(sku = %req.sku))]
pub async fn create(
    State(state): State<ProductState>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<ProductState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.get_product(parse_id::<ProductId>(&id)?).await?;
    Ok(Json(ProductResponse::from(&product)))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<ProductState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.get_all_products().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// POST /products/reserve
#[tracing::instrument(skip(state))]
pub async fn reserve(
    State(state): State<ProductState>,
    Json(req): Json<StockRequest>,
) -> Result<Json<StockResponse>, ApiError> {
    state.reserve_stock(req.product_id, req.quantity).await?;
    Ok(Json(StockResponse { message: "reserved" }))
}

/// POST /products/release
#[tracing::instrument(skip(state))]
pub async fn release(
    State(state): State<ProductState>,
    Json(req): Json<StockRequest>,
) -> Result<Json<StockResponse>, ApiError> {
    state.release_stock(req.product_id, req.quantity).await?;
    Ok(Json(StockResponse { message: "released" }))
}

/// POST /products/confirm
#[tracing::instrument(skip(state))]
pub async fn confirm(
    State(state): State<ProductState>,
    Json(req): Json<StockRequest>,
) -> Result<Json<StockResponse>, ApiError> {
    state.confirm_stock(req.product_id, req.quantity).await?;
    Ok(Json(StockResponse { message: "confirmed" }))
}
