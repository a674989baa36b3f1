//! Request/response shapes that don't map 1:1 onto domain types.
//! Creation payloads (`NewProduct`, `NewCartLine`, `OrderDraft`) deserialize
//! directly and are not duplicated here.

use serde::{Deserialize, Serialize};

use savx_orders::OrderStatus;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    /// Admin view: include disabled products.
    #[serde(default)]
    pub include_disabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// Payment gateway callback. `merchant_order_id` is the internal order id we
/// handed the gateway at checkout.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhookRequest {
    pub success: bool,
    pub merchant_order_id: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearedCartResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct VariantStockResponse {
    pub stock: i64,
}
