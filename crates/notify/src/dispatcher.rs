use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use savx_core::OrderId;
use savx_orders::{CustomerInfo, Order, OrderStatus, ShippingInfo};

/// One line of an order summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub product_name: String,
    pub color_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Opaque order payload handed to the notifier after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer: CustomerInfo,
    pub shipping: ShippingInfo,
    pub total_cents: i64,
    pub placed_at: DateTime<Utc>,
    pub lines: Vec<SummaryLine>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        OrderSummary {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer: order.customer.clone(),
            shipping: order.shipping.clone(),
            total_cents: order.total_cents,
            placed_at: order.placed_at,
            lines: order
                .items
                .iter()
                .map(|i| SummaryLine {
                    product_name: i.product_name.clone(),
                    color_name: i.color_name.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Order notification sink.
///
/// The storefront never awaits this for correctness: dispatch happens after
/// the order has committed and failures are logged, not propagated.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// A new order was placed (admin + customer confirmation).
    async fn order_placed(&self, summary: &OrderSummary) -> Result<(), NotifyError>;

    /// An existing order changed status (customer update).
    async fn status_changed(
        &self,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<(), NotifyError>;
}

/// Notifier that writes structured log lines instead of sending mail.
///
/// The real mail sender is external glue; this keeps the contract visible
/// in dev and test environments.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn order_placed(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        tracing::info!(
            order_number = %summary.order_number,
            customer = %summary.customer.email,
            total_cents = summary.total_cents,
            lines = summary.lines.len(),
            "order placed"
        );
        Ok(())
    }

    async fn status_changed(
        &self,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<(), NotifyError> {
        tracing::info!(order_number, status = %status, "order status changed");
        Ok(())
    }
}

/// Recording notifier for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    placed: Mutex<Vec<OrderSummary>>,
    status_changes: Mutex<Vec<(String, OrderStatus)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placed(&self) -> Vec<OrderSummary> {
        self.placed.lock().expect("notifier lock poisoned").clone()
    }

    pub fn status_changes(&self) -> Vec<(String, OrderStatus)> {
        self.status_changes
            .lock()
            .expect("notifier lock poisoned")
            .clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn order_placed(&self, summary: &OrderSummary) -> Result<(), NotifyError> {
        self.placed
            .lock()
            .expect("notifier lock poisoned")
            .push(summary.clone());
        Ok(())
    }

    async fn status_changed(
        &self,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<(), NotifyError> {
        self.status_changes
            .lock()
            .expect("notifier lock poisoned")
            .push((order_number.to_string(), status));
        Ok(())
    }
}

/// Fire-and-forget dispatch of an order-placed notification.
///
/// Spawned off the request path; a failed delivery is logged and swallowed
/// because the order has already committed.
pub fn dispatch_order_placed(notifier: Arc<dyn OrderNotifier>, summary: OrderSummary) {
    tokio::spawn(async move {
        if let Err(e) = notifier.order_placed(&summary).await {
            tracing::warn!(
                order_number = %summary.order_number,
                error = %e,
                "order notification failed"
            );
        }
    });
}

/// Fire-and-forget dispatch of a status-change notification.
pub fn dispatch_status_changed(
    notifier: Arc<dyn OrderNotifier>,
    order_number: String,
    status: OrderStatus,
) {
    tokio::spawn(async move {
        if let Err(e) = notifier.status_changed(&order_number, status).await {
            tracing::warn!(order_number, error = %e, "status notification failed");
        }
    });
}
