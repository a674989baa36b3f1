//! Order lifecycle status.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use savx_core::DomainError;

/// Order lifecycle: `pending → processing → shipped → delivered`, with
/// `cancelled` as a side state.
///
/// Transitions are admin-triggered and deliberately NOT validated against a
/// strict state machine (any status may be set from any status); callers must
/// not assume enforced ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Which lifecycle timestamp this status stamps on entry, if any.
    pub fn stamp(self) -> Option<StatusStamp> {
        match self {
            OrderStatus::Shipped => Some(StatusStamp::ShippedAt),
            OrderStatus::Delivered => Some(StatusStamp::DeliveredAt),
            _ => None,
        }
    }
}

/// Timestamp field stamped when an order reaches a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStamp {
    ShippedAt,
    DeliveredAt,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Whether moving `from → to` should trigger a best-effort customer
/// notification. Leaving `pending` is the signal that the shop has picked
/// the order up.
pub fn notifies_customer(from: OrderStatus, to: OrderStatus) -> bool {
    from == OrderStatus::Pending && to != OrderStatus::Pending
}
