use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use savx_carts::NewCartLine;
use savx_core::{CartLineId, DomainError, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_line))
        .route("/lines/:id", put(set_quantity).delete(remove_line))
        .route("/:user_id", get(cart_contents).delete(clear_cart))
}

pub async fn cart_contents(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user: UserId = match user_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.carts.lines_for(user).await {
        Ok(lines) => Json(lines).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn add_line(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCartLine>,
) -> axum::response::Response {
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }
    match services.carts.add(body).await {
        Ok(line) => (StatusCode::CREATED, Json(line)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn set_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetQuantityRequest>,
) -> axum::response::Response {
    let id: CartLineId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if body.quantity < 1 {
        return errors::domain_error_to_response(DomainError::validation(
            "quantity must be positive",
        ));
    }
    match services.carts.set_quantity(id, body.quantity).await {
        Ok(line) => Json(line).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove_line(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CartLineId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.carts.remove(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let user: UserId = match user_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.carts.clear(user).await {
        Ok(removed) => Json(dto::ClearedCartResponse { removed }).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
