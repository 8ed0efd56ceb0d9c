//! Product entity.

use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a product cannot be constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("product id must not be empty")]
    EmptyId,
    #[error("product name must not be empty")]
    EmptyName,
    #[error("product price must not be negative, got {0}")]
    NegativePrice(Decimal),
}

/// A fully hydrated product, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: String,
    name: String,
    price: Decimal,
    available: bool,
}

impl Product {
    /// Build a product, enforcing non-empty id/name and non-negative price.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        available: bool,
    ) -> Result<Self, ProductError> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(ProductError::EmptyId);
        }
        if name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if price < Decimal::ZERO {
            return Err(ProductError::NegativePrice(price));
        }

        Ok(Self {
            id,
            name,
            price,
            available,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn available(&self) -> bool {
        self.available
    }
}
