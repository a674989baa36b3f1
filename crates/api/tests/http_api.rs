//! Black-box tests for the HTTP surface, run against the in-memory backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use savx_api::app::{build_app_with, services::AppServices};
use savx_notify::RecordingNotifier;

fn test_app() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let services = Arc::new(AppServices::in_memory(notifier.clone()));
    (build_app_with(services), notifier)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn watch_product() -> Value {
    json!({
        "name": "Modern Black Watch",
        "price_cents": 2999,
        "category": "watches",
        "description": "A modern black watch",
        "image": null,
        "discount_percent": null,
        "original_price_cents": null,
        "variants": [
            {
                "color_name": "Black",
                "color_code": "#000000",
                "price_cents": null,
                "stock": 5,
                "image": null
            }
        ]
    })
}

async fn seed_product(app: &Router) -> Value {
    let (status, product) = send(app, "POST", "/products", Some(watch_product())).await;
    assert_eq!(status, StatusCode::CREATED);
    product
}

fn draft_for(product: &Value, quantity: i64) -> Value {
    let variant = &product["variants"][0];
    json!({
        "customer": {
            "full_name": "Ayman Farouk",
            "email": "ayman@example.com",
            "phone": "+20100000000"
        },
        "shipping": {
            "address": "12 Tahrir St",
            "city": "Cairo",
            "governorate": "Cairo",
            "notes": null
        },
        "lines": [
            {
                "product_id": product["id"],
                "variant_id": variant["id"],
                "quantity": quantity,
                "unit_price_cents": 2999,
                "product_name": "Modern Black Watch",
                "color_name": "Black"
            }
        ],
        "order_number": null
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_app();
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn product_crud_over_http() {
    let (app, _) = test_app();
    let product = seed_product(&app).await;
    let id = product["id"].as_str().unwrap();

    let (status, fetched) = send(&app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Modern Black Watch");

    let (status, _) = send(&app, "GET", "/products/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/products/{id}"),
        Some(json!({"disabled": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["disabled"], true);

    // Disabled products disappear from the storefront listing.
    let (_, listed) = send(&app, "GET", "/products", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
    let (_, listed) = send(&app, "GET", "/products?include_disabled=true", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_product_payload_is_rejected() {
    let (app, _) = test_app();
    let mut body = watch_product();
    body["price_cents"] = json!(0);
    let (status, error) = send(&app, "POST", "/products", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");
}

#[tokio::test]
async fn cart_add_merges_and_clear_reports_count() {
    let (app, _) = test_app();
    let product = seed_product(&app).await;
    let user_id = uuid::Uuid::now_v7().to_string();

    let add = json!({
        "user_id": user_id,
        "product_id": product["id"],
        "variant_id": product["variants"][0]["id"],
        "quantity": 2
    });
    let (status, first) = send(&app, "POST", "/cart", Some(add.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, merged) = send(&app, "POST", "/cart", Some(add)).await;
    assert_eq!(merged["id"], first["id"]);
    assert_eq!(merged["quantity"], 4);

    let (_, contents) = send(&app, "GET", &format!("/cart/{user_id}"), None).await;
    let lines = contents.as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["unit_price_cents"], 2999);

    let (status, cleared) = send(&app, "DELETE", &format!("/cart/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["removed"], 1);
}

#[tokio::test]
async fn placement_decrements_stock_and_notifies() {
    let (app, notifier) = test_app();
    let product = seed_product(&app).await;
    let variant_id = product["variants"][0]["id"].as_str().unwrap().to_string();

    let (status, order) = send(&app, "POST", "/orders", Some(draft_for(&product, 3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_cents"], 3 * 2999);
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));

    let (_, stock) = send(&app, "GET", &format!("/inventory/{variant_id}"), None).await;
    assert_eq!(stock["stock"], 2);

    // Notification dispatch is spawned; give it a turn of the executor.
    tokio::task::yield_now().await;
    let placed = notifier.placed();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].total_cents, 3 * 2999);
}

#[tokio::test]
async fn oversell_is_rejected_with_shortage_detail() {
    let (app, _) = test_app();
    let product = seed_product(&app).await;

    let (status, error) = send(&app, "POST", "/orders", Some(draft_for(&product, 9))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "insufficient_stock");
    assert_eq!(error["shortages"][0]["requested"], 9);
    assert_eq!(error["shortages"][0]["available"], 5);

    // Rejected placements leave no orders behind.
    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn status_updates_stamp_timestamps_and_notify_once() {
    let (app, notifier) = test_app();
    let product = seed_product(&app).await;
    let (_, order) = send(&app, "POST", "/orders", Some(draft_for(&product, 1))).await;
    let number = order["order_number"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/orders/{number}/status"),
        Some(json!({"status": "shipped"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["previous"], "pending");
    assert_eq!(body["order"]["status"], "shipped");
    assert!(body["order"]["tracking"]["shipped_at"].is_string());

    // Shipped -> delivered leaves pending behind, so no second notification.
    let (_, body) = send(
        &app,
        "PUT",
        &format!("/orders/{number}/status"),
        Some(json!({"status": "delivered"})),
    )
    .await;
    assert_eq!(body["previous"], "shipped");

    tokio::task::yield_now().await;
    let changes = notifier.status_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].0, number);
}

#[tokio::test]
async fn orders_are_queryable_by_phone_and_deletable_by_number() {
    let (app, _) = test_app();
    let product = seed_product(&app).await;
    let (_, order) = send(&app, "POST", "/orders", Some(draft_for(&product, 1))).await;
    let number = order["order_number"].as_str().unwrap().to_string();

    let (_, by_phone) = send(&app, "GET", "/orders/phone/+20100000000", None).await;
    assert_eq!(by_phone.as_array().unwrap().len(), 1);

    let (status, fetched) = send(&app, "GET", &format!("/orders/{number}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], order["id"]);

    let (status, _) = send(&app, "DELETE", &format!("/orders/{number}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/orders/{number}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_webhook_drives_status() {
    let (app, _) = test_app();
    let product = seed_product(&app).await;
    let (_, order) = send(&app, "POST", "/orders", Some(draft_for(&product, 1))).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/payment/webhook",
        Some(json!({
            "success": true,
            "merchant_order_id": order_id,
            "transaction_id": "txn-123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");

    let (status, _) = send(
        &app,
        "POST",
        "/payment/webhook",
        Some(json!({
            "success": false,
            "merchant_order_id": uuid::Uuid::now_v7().to_string(),
            "transaction_id": null
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
