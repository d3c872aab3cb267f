//! Inventory error types.

use folio_shared::types::{LotId, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by FIFO lot operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Lots do not cover the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, \
         available {available}"
    )]
    InsufficientLots {
        /// Product drawn.
        product_id: ProductId,
        /// Quantity asked for.
        requested: Decimal,
        /// Quantity on hand.
        available: Decimal,
    },

    /// Quantity must be positive (or non-negative for stock counts).
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    /// Unit cost must not be negative.
    #[error("Invalid unit cost: {0}")]
    InvalidUnitCost(Decimal),

    /// A consumption refers to a lot that no longer exists.
    #[error("Cost lot not found: {0}")]
    LotNotFound(LotId),

    /// A lot created by a document has already been drawn from, so the
    /// document's stock movement cannot be undone.
    #[error("Cost lot {0} has already been drawn from")]
    LotAlreadyDrawn(LotId),

    /// A stock surplus cannot be valued because the product has no lots.
    #[error("No cost basis for product {0}")]
    NoCostBasis(ProductId),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLots { .. } => "INSUFFICIENT_LOTS",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidUnitCost(_) => "INVALID_UNIT_COST",
            Self::LotNotFound(_) => "LOT_NOT_FOUND",
            Self::LotAlreadyDrawn(_) => "LOT_ALREADY_DRAWN",
            Self::NoCostBasis(_) => "NO_COST_BASIS",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InsufficientLots { .. } | Self::NoCostBasis(_) => 422,
            Self::InvalidQuantity(_) | Self::InvalidUnitCost(_) => 400,
            Self::LotNotFound(_) => 404,
            Self::LotAlreadyDrawn(_) => 409,
            Self::Store(e) => e.http_status_code(),
        }
    }
}
