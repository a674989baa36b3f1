use axum::{routing::get, Router};

pub mod carts;
pub mod inventory;
pub mod orders;
pub mod payment;
pub mod products;
pub mod system;

/// Full storefront router.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/products", products::router())
        .nest("/cart", carts::router())
        .nest("/orders", orders::router())
        .nest("/inventory", inventory::router())
        .nest("/payment", payment::router())
}
