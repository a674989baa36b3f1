use std::sync::Arc;

use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};

use savx_notify::dispatch_status_changed;
use savx_orders::{notifies_customer, OrderStatus};
use savx_store::OrderRef;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/webhook", post(webhook))
}

/// Gateway callback. A successful payment moves the order to `processing`,
/// a failed one to `cancelled`. Unknown merchant order ids get a 404 so the
/// gateway retries instead of dropping the event.
pub async fn webhook(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PaymentWebhookRequest>,
) -> axum::response::Response {
    let order_ref = OrderRef::parse(&body.merchant_order_id);
    let target = if body.success {
        OrderStatus::Processing
    } else {
        OrderStatus::Cancelled
    };

    tracing::info!(
        merchant_order_id = %body.merchant_order_id,
        transaction_id = body.transaction_id.as_deref().unwrap_or(""),
        success = body.success,
        "payment webhook received"
    );

    let change = match services.orders.set_status(&order_ref, target).await {
        Ok(change) => change,
        Err(e) => return errors::store_error_to_response(e),
    };

    if notifies_customer(change.previous, change.order.status) {
        dispatch_status_changed(
            services.notifier.clone(),
            change.order.order_number.clone(),
            change.order.status,
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "order_number": change.order.order_number,
            "status": change.order.status,
        })),
    )
        .into_response()
}
