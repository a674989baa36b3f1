use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use savx_core::VariantId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:variant_id", get(variant_stock))
}

/// Admin read of the authoritative stock counter for one variant.
pub async fn variant_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(variant_id): Path<String>,
) -> axum::response::Response {
    let variant: VariantId = match variant_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.inventory.stock_of(variant).await {
        Ok(Some(stock)) => Json(dto::VariantStockResponse { stock }).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "variant not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
