//! Human-facing order number generation.
//!
//! The order number is distinct from the internal `OrderId`. It is generated
//! server-side from a UUIDv7 so uniqueness does not depend on client
//! cooperation; the database unique constraint remains the final arbiter.

use uuid::Uuid;

/// Prefix carried by every generated order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Generate a new order number, e.g. `ORD-0192F3A4B5C6D7E8`.
///
/// Uses the first 16 hex digits of a UUIDv7, which keeps numbers
/// time-sortable and short enough to read over the phone.
pub fn generate() -> String {
    let simple = Uuid::now_v7().simple().to_string().to_uppercase();
    format!("{}{}", ORDER_NUMBER_PREFIX, &simple[..16])
}
