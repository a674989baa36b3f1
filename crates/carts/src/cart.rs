use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use savx_core::{CartLineId, DomainError, DomainResult, ProductId, UserId, VariantId};

/// One open cart line.
///
/// Invariant: at most one open line exists per (user, product, variant);
/// repeated adds merge into the existing line instead of duplicating rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Whether `other` targets the same (user, product, variant) triple and
    /// should therefore merge into this line.
    pub fn merges_with(&self, other: &NewCartLine) -> bool {
        self.user_id == other.user_id
            && self.product_id == other.product_id
            && self.variant_id == other.variant_id
    }

    /// Quantity after merging an add of `qty` into this line.
    pub fn merged_quantity(&self, qty: i64) -> i64 {
        self.quantity + qty
    }
}

/// Payload for adding an item to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartLine {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
}

impl NewCartLine {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 1 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

/// Cart line joined with the product data the storefront renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineDetail {
    pub line: CartLine,
    pub product_name: String,
    pub color_name: String,
    /// Effective unit price (variant override applied). Cents.
    pub unit_price_cents: i64,
    pub image: Option<String>,
}
