//! `savx-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod order_number;

pub use error::{DomainError, DomainResult};
pub use id::{CartLineId, OrderId, ProductId, UserId, VariantId};
