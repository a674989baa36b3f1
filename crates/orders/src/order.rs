use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use savx_core::{OrderId, ProductId, VariantId};

use crate::status::OrderStatus;

/// Denormalized customer contact captured at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

/// Denormalized shipping destination captured at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub governorate: String,
    pub notes: Option<String>,
}

/// Carrier tracking fields, set by admin actions after placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Snapshot of a purchased variant at order time.
///
/// Denormalized names and price protect historical orders from later
/// catalog edits. Line items are created atomically with the order header
/// and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub product_name: String,
    pub color_name: String,
}

/// Placed order: immutable header except for status and tracking fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing unique identifier, distinct from the internal id.
    pub order_number: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub customer: CustomerInfo,
    pub shipping: ShippingInfo,
    pub tracking: Tracking,
    pub items: Vec<OrderLineItem>,
}

/// Result of a status update: previous and current status, for callers that
/// decide whether to notify the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
}
