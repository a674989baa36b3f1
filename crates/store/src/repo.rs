//! Repository traits: the seams between the HTTP surface and the backends.
//!
//! Every trait has two implementations: [`crate::memory::MemoryStore`]
//! (dev/test) and [`crate::postgres::PgStore`] (production), selected at
//! startup the same way for both.

use core::str::FromStr;

use async_trait::async_trait;

use savx_carts::{CartLine, CartLineDetail, NewCartLine};
use savx_catalog::{NewProduct, Product, ProductUpdate};
use savx_core::{CartLineId, OrderId, ProductId, UserId, VariantId};
use savx_orders::{Order, OrderDraft, OrderStatus, PlaceOrderError, StatusChange};

use crate::error::StoreError;

/// Reference to an order: internal id or human-facing order number.
///
/// A UUID-shaped string is ambiguous: it may be an internal id, but a
/// caller-supplied order number can be UUID-shaped too. The raw string is
/// kept alongside the id interpretation so lookups match either column,
/// like `WHERE id = $1 OR order_number = $2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRef {
    raw: String,
    id: Option<OrderId>,
}

impl OrderRef {
    pub fn parse(s: &str) -> Self {
        Self {
            raw: s.to_string(),
            id: s.parse().ok(),
        }
    }

    pub fn from_id(id: OrderId) -> Self {
        Self {
            raw: id.to_string(),
            id: Some(id),
        }
    }

    /// The id interpretation, when the string is UUID-shaped.
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// The raw string, matched against order numbers.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for OrderRef {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OrderRef::parse(s))
    }
}

/// Catalog repository (admin CRUD + storefront reads).
#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// List products, optionally filtered by category. Disabled products are
    /// hidden unless `include_disabled` (admin view) is set.
    async fn list(
        &self,
        category: Option<&str>,
        include_disabled: bool,
    ) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError>;

    /// Partial update; `variants`, when present, replaces the variant set.
    async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError>;

    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;
}

/// Cart repository.
#[async_trait]
pub trait CartRepo: Send + Sync {
    async fn lines_for(&self, user: UserId) -> Result<Vec<CartLineDetail>, StoreError>;

    /// Add to cart. An existing line for the same (user, product, variant)
    /// triple absorbs the quantity instead of duplicating the row.
    async fn add(&self, new: NewCartLine) -> Result<CartLine, StoreError>;

    async fn set_quantity(&self, id: CartLineId, quantity: i64) -> Result<CartLine, StoreError>;

    async fn remove(&self, id: CartLineId) -> Result<(), StoreError>;

    /// Clear a user's cart; returns the number of removed lines.
    async fn clear(&self, user: UserId) -> Result<u64, StoreError>;
}

/// Authoritative per-variant stock counter.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Current stock for a variant, `None` when the variant does not exist.
    async fn stock_of(&self, variant: VariantId) -> Result<Option<i64>, StoreError>;

    /// Decrement stock only if at least `quantity` is on hand; reports
    /// whether the decrement applied (affected-row count). This conditional
    /// update is the sole guard against overselling.
    async fn conditional_decrement(
        &self,
        variant: VariantId,
        quantity: i64,
    ) -> Result<bool, StoreError>;
}

/// Order repository: the transactional write path plus admin queries.
#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// Atomically validate, persist and decrement inventory for a cart
    /// submission, or fail leaving no partial state. Returns the placed
    /// order (id, generated order number, snapshot items).
    async fn place(&self, draft: OrderDraft) -> Result<Order, PlaceOrderError>;

    /// All orders with their line items, newest first (admin view).
    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    async fn find(&self, order: &OrderRef) -> Result<Option<Order>, StoreError>;

    /// Orders placed under a customer phone number, newest first.
    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, StoreError>;

    /// Set the order status, stamping `shipped_at`/`delivered_at` when the
    /// respective state is reached. Returns the updated order and the
    /// previous status so the caller can decide whether to notify.
    async fn set_status(
        &self,
        order: &OrderRef,
        status: OrderStatus,
    ) -> Result<StatusChange, StoreError>;

    /// Remove an order and its line items in one transaction.
    async fn delete(&self, order: &OrderRef) -> Result<(), StoreError>;
}
