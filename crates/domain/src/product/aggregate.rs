//! Product aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductError;
use crate::store::StockOperation;

/// Product aggregate root, owned by the inventory service.
///
/// Invariant: `0 <= reserved_qty <= total_qty` before and after every
/// operation. The checked transitions below leave the product untouched when
/// they fail, so a store can apply them under a single lock. Stored products
/// come back through [`ProductRecord`], which checks the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: String,
    price: Money,
    total_qty: i32,
    reserved_qty: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds a freshly created product from a validated request.
    pub fn create(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> Result<Self, ProductError> {
        new.validate()?;
        Ok(Self {
            id,
            sku: new.sku,
            name: new.name,
            description: new.description,
            price: new.price,
            total_qty: new.total_qty,
            reserved_qty: 0,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn total_qty(&self) -> i32 {
        self.total_qty
    }

    pub fn reserved_qty(&self) -> i32 {
        self.reserved_qty
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stock that is neither reserved nor deducted.
    pub fn available_qty(&self) -> i32 {
        self.total_qty - self.reserved_qty
    }

    /// Returns the read-only snapshot shared across the service boundary.
    pub fn view(&self) -> ProductView {
        ProductView {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
        }
    }

    /// Earmarks `qty` units if at least that many are available.
    pub fn reserve(&mut self, qty: i32) -> Result<(), ProductError> {
        ensure_positive(qty)?;
        if self.available_qty() < qty {
            return Err(ProductError::InsufficientStock {
                product_id: self.id,
                requested: qty,
                available: self.available_qty(),
            });
        }
        self.reserved_qty += qty;
        self.touch();
        Ok(())
    }

    /// Returns `qty` reserved units to available stock.
    pub fn release(&mut self, qty: i32) -> Result<(), ProductError> {
        self.ensure_reserved(StockOperation::Release, qty)?;
        self.reserved_qty -= qty;
        self.touch();
        Ok(())
    }

    /// Permanently deducts `qty` reserved units from total stock.
    pub fn confirm(&mut self, qty: i32) -> Result<(), ProductError> {
        self.ensure_reserved(StockOperation::Confirm, qty)?;
        self.reserved_qty -= qty;
        self.total_qty -= qty;
        self.touch();
        Ok(())
    }

    fn ensure_reserved(&self, operation: StockOperation, qty: i32) -> Result<(), ProductError> {
        ensure_positive(qty)?;
        if self.reserved_qty < qty {
            return Err(ProductError::ExceedsReserved {
                product_id: self.id,
                operation,
                requested: qty,
                reserved: self.reserved_qty,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn ensure_positive(qty: i32) -> Result<(), ProductError> {
    if qty <= 0 {
        return Err(ProductError::InvalidQuantity { quantity: qty });
    }
    Ok(())
}

/// Largest accepted unit price: the range of the `NUMERIC(12, 2)` price column.
pub fn max_price() -> Money {
    Money::new(Decimal::new(999_999_999_999, 2))
}

/// Request to create a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub total_qty: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewProduct {
    /// Creates an active product request.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        total_qty: i32,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            price,
            total_qty,
            is_active: true,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::NameRequired);
        }
        if self.total_qty < 0 {
            return Err(ProductError::NegativeStock {
                total_qty: self.total_qty,
            });
        }
        if self.price.is_negative() {
            return Err(ProductError::NegativePrice(self.price));
        }
        if self.price > max_price() {
            return Err(ProductError::PriceTooLarge(self.price));
        }
        Ok(())
    }
}

/// Read-only product snapshot returned across the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
}

/// Column values of a persisted product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub total_qty: i32,
    pub reserved_qty: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRecord> for Product {
    type Error = ProductError;

    fn try_from(record: ProductRecord) -> Result<Self, Self::Error> {
        if record.reserved_qty < 0 || record.reserved_qty > record.total_qty {
            return Err(ProductError::CorruptStock {
                product_id: record.id,
                total_qty: record.total_qty,
                reserved_qty: record.reserved_qty,
            });
        }
        Ok(Self {
            id: record.id,
            sku: record.sku,
            name: record.name,
            description: record.description,
            price: record.price,
            total_qty: record.total_qty,
            reserved_qty: record.reserved_qty,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
