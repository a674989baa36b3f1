//! `savx-store` — storage backends for the storefront.
//!
//! Repository traits live in [`repo`]; [`memory::MemoryStore`] backs dev and
//! tests, [`postgres::PgStore`] backs production. Both implement the same
//! placement contract: validate, pre-check stock, conditionally decrement,
//! and leave no partial state on failure.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repo;

pub use error::{is_unique_violation, map_sqlx_error, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repo::{CartRepo, InventoryLedger, OrderRef, OrderRepo, ProductRepo};

#[cfg(test)]
mod store_tests;
