//! HTTP route handlers for both services.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::num::ParseIntError;

use crate::error::ApiError;

/// Parses a numeric path id, rejecting non-numeric input with a JSON 400.
pub(crate) fn parse_id<T: From<i64>>(raw: &str) -> Result<T, ApiError> {
    raw.parse::<i64>()
        .map(T::from)
        .map_err(|e: ParseIntError| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
