//! Backend wiring: one set of repository handles behind `Arc<dyn Trait>`,
//! backed either by the in-memory store (dev/test) or Postgres, selected via
//! `USE_PERSISTENT_STORES`.

use std::sync::Arc;

use savx_notify::{LogNotifier, OrderNotifier};
use savx_store::{CartRepo, InventoryLedger, MemoryStore, OrderRepo, PgStore, ProductRepo};

/// Handles the route handlers work through. The backends are injected here
/// so handlers stay agnostic of the storage choice.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<dyn ProductRepo>,
    pub carts: Arc<dyn CartRepo>,
    pub inventory: Arc<dyn InventoryLedger>,
    pub orders: Arc<dyn OrderRepo>,
    pub notifier: Arc<dyn OrderNotifier>,
}

impl AppServices {
    /// Wire every repository to one shared in-memory store.
    pub fn in_memory(notifier: Arc<dyn OrderNotifier>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            products: store.clone(),
            carts: store.clone(),
            inventory: store.clone(),
            orders: store,
            notifier,
        }
    }

    fn persistent(store: PgStore, notifier: Arc<dyn OrderNotifier>) -> Self {
        let store = Arc::new(store);
        Self {
            products: store.clone(),
            carts: store.clone(),
            inventory: store.clone(),
            orders: store,
            notifier,
        }
    }
}

/// Build services per environment configuration.
pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if use_persistent {
        build_persistent_services().await
    } else {
        tracing::info!("using in-memory stores");
        AppServices::in_memory(Arc::new(LogNotifier))
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let store = PgStore::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    tracing::info!("using Postgres stores");
    AppServices::persistent(store, Arc::new(LogNotifier))
}
