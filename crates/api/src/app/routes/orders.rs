use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use savx_notify::{dispatch_order_placed, dispatch_status_changed, OrderSummary};
use savx_orders::{notifies_customer, OrderDraft};
use savx_store::OrderRef;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_orders))
        .route("/phone/:phone", get(orders_by_phone))
        .route("/:order_ref", get(get_order).delete(delete_order))
        .route("/:order_ref/status", put(set_status))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(draft): Json<OrderDraft>,
) -> axum::response::Response {
    let order = match services.orders.place(draft).await {
        Ok(order) => order,
        Err(e) => return errors::place_order_error_to_response(e),
    };

    // Post-commit, fire-and-forget: the response never waits on delivery.
    dispatch_order_placed(services.notifier.clone(), OrderSummary::from(&order));

    (StatusCode::CREATED, Json(order)).into_response()
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.orders.list().await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(order_ref): Path<String>,
) -> axum::response::Response {
    match services.orders.find(&OrderRef::parse(&order_ref)).await {
        Ok(Some(order)) => Json(order).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn orders_by_phone(
    Extension(services): Extension<Arc<AppServices>>,
    Path(phone): Path<String>,
) -> axum::response::Response {
    match services.orders.find_by_phone(&phone).await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(order_ref): Path<String>,
    Json(body): Json<dto::SetStatusRequest>,
) -> axum::response::Response {
    let change = match services
        .orders
        .set_status(&OrderRef::parse(&order_ref), body.status)
        .await
    {
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

    Json(serde_json::json!({
        "previous": change.previous,
        "order": change.order,
    }))
    .into_response()
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(order_ref): Path<String>,
) -> axum::response::Response {
    match services.orders.delete(&OrderRef::parse(&order_ref)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
