//! HTTP implementation of the inventory client.

use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::{ProductView, StockOperation};
use reqwest::{Client, StatusCode};

use super::inventory::{InventoryClient, StockRequest};
use crate::error::SagaError;

/// Default per-request timeout for calls to the inventory service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Inventory client that talks to the inventory service's REST API.
///
/// Status mapping: 404 is [`SagaError::ProductNotFound`], 422 is
/// [`SagaError::InsufficientStock`], and any other non-success status or
/// transport failure is [`SagaError::InventoryService`].
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    client: Client,
    base_url: String,
}

impl HttpInventoryClient {
    /// Creates a client for the inventory service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SagaError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SagaError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_stock(
        &self,
        operation: StockOperation,
        request: StockRequest,
    ) -> Result<(), SagaError> {
        let url = format!("{}/products/{operation}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(SagaError::ProductNotFound(request.product_id)),
            StatusCode::UNPROCESSABLE_ENTITY => Err(SagaError::InsufficientStock {
                product_id: request.product_id,
                requested: request.quantity,
            }),
            status => Err(unexpected(operation.as_str(), status, response).await),
        }
    }
}

fn transport(err: reqwest::Error) -> SagaError {
    SagaError::InventoryService(err.to_string())
}

async fn unexpected(
    action: &'static str,
    status: StatusCode,
    response: reqwest::Response,
) -> SagaError {
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(action, %status, %body, "unexpected inventory response");
    SagaError::InventoryService(format!("{action} failed with status {status}"))
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[tracing::instrument(skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<ProductView, SagaError> {
        let url = format!("{}/products/{id}", self.base_url);
        let response = self.client.get(&url).send().await.map_err(transport)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(transport),
            StatusCode::NOT_FOUND => Err(SagaError::ProductNotFound(id)),
            status => Err(unexpected("get_product", status, response).await),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        self.post_stock(
            StockOperation::Reserve,
            StockRequest {
                product_id: id,
                quantity,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        self.post_stock(
            StockOperation::Release,
            StockRequest {
                product_id: id,
                quantity,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        self.post_stock(
            StockOperation::Confirm,
            StockRequest {
                product_id: id,
                quantity,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpInventoryClient::new("http://localhost:8081/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8081");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client =
            HttpInventoryClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(200))
                .unwrap();
        let result = client.reserve_stock(ProductId::new(1), 1).await;
        assert!(matches!(result, Err(SagaError::InventoryService(_))));
    }
}
