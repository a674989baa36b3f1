use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use savx_core::DomainError;
use savx_orders::PlaceOrderError;
use savx_store::StoreError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Backend(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

/// Placement errors carry enough detail for the storefront to react; the
/// insufficient-stock case ships the full shortage list.
pub fn place_order_error_to_response(err: PlaceOrderError) -> axum::response::Response {
    match &err {
        PlaceOrderError::EmptyOrder
        | PlaceOrderError::MissingVariant { .. }
        | PlaceOrderError::InvalidQuantity { .. }
        | PlaceOrderError::InvalidPrice { .. } => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        PlaceOrderError::VariantNotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "variant_not_found", err.to_string())
        }
        PlaceOrderError::InsufficientStock { shortages } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": err.to_string(),
                "shortages": shortages,
            })),
        )
            .into_response(),
        PlaceOrderError::DuplicateOrderNumber(_) => {
            json_error(StatusCode::CONFLICT, "duplicate_order_number", err.to_string())
        }
        PlaceOrderError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg.clone())
        }
    }
}
