//! Order placement error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use savx_core::VariantId;

/// Per-line stock shortfall, reported back to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortage {
    pub variant_id: VariantId,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

/// Everything that can go wrong while placing an order.
///
/// Validation and stock variants are rejected before any write and leave no
/// side effects. `DuplicateOrderNumber` surfaces from the write phase after
/// the transaction has been rolled back. `Storage` covers backend failures
/// (also rolled back).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceOrderError {
    /// The submitted line list was empty.
    #[error("order contains no items")]
    EmptyOrder,

    /// A line was submitted without a variant selection.
    #[error("line {line} is missing a variant selection")]
    MissingVariant { line: usize },

    /// A line carried a non-positive quantity.
    #[error("line {line} has a non-positive quantity")]
    InvalidQuantity { line: usize },

    /// A line carried a negative unit price.
    #[error("line {line} has a negative unit price")]
    InvalidPrice { line: usize },

    /// A referenced variant does not exist.
    #[error("variant {variant_id} not found")]
    VariantNotFound { variant_id: VariantId },

    /// One or more lines requested more than is on hand.
    #[error("insufficient stock for {} line(s)", shortages.len())]
    InsufficientStock { shortages: Vec<Shortage> },

    /// The caller-supplied order number already exists.
    #[error("order number {0} already exists")]
    DuplicateOrderNumber(String),

    /// The backing store failed; the transaction was rolled back.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl PlaceOrderError {
    /// True for errors the customer can act on (as opposed to backend faults).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, PlaceOrderError::Storage(_))
    }
}
