//! Behavior tests for the placement contract and the repositories, run
//! against the in-memory backend. The Postgres backend shares the same SQL
//! semantics (conditional decrement, unique order number, cascade deletes).

use std::sync::Arc;

use savx_carts::NewCartLine;
use savx_catalog::{NewProduct, NewVariant, ProductUpdate};
use savx_core::{order_number, UserId, VariantId};
use savx_orders::{
    CustomerInfo, DraftLine, OrderDraft, OrderStatus, PlaceOrderError, ShippingInfo,
};

use crate::memory::MemoryStore;
use crate::repo::{CartRepo, InventoryLedger, OrderRef, OrderRepo, ProductRepo};
use crate::StoreError;

fn new_product(stocks: &[i64]) -> NewProduct {
    NewProduct {
        name: "Modern Black Watch".to_string(),
        price_cents: 2999,
        category: "watches".to_string(),
        description: "A modern black watch".to_string(),
        image: None,
        discount_percent: None,
        original_price_cents: None,
        variants: stocks
            .iter()
            .enumerate()
            .map(|(i, &stock)| NewVariant {
                color_name: format!("Color {i}"),
                color_code: "#000000".to_string(),
                price_cents: None,
                stock,
                image: None,
            })
            .collect(),
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        full_name: "Ayman Farouk".to_string(),
        email: "ayman@example.com".to_string(),
        phone: "+20100000000".to_string(),
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        address: "12 Tahrir St".to_string(),
        city: "Cairo".to_string(),
        governorate: "Cairo".to_string(),
        notes: None,
    }
}

fn draft_for(lines: Vec<DraftLine>) -> OrderDraft {
    OrderDraft {
        customer: customer(),
        shipping: shipping(),
        lines,
        order_number: None,
    }
}

fn line(product: &savx_catalog::Product, variant_idx: usize, qty: i64) -> DraftLine {
    let v = &product.variants[variant_idx];
    DraftLine {
        product_id: product.id,
        variant_id: Some(v.id),
        quantity: qty,
        unit_price_cents: v.effective_price_cents(product.price_cents),
        product_name: product.name.clone(),
        color_name: v.color_name.clone(),
    }
}

#[tokio::test]
async fn placement_decrements_stock_and_creates_pending_order() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();
    let variant = product.variants[0].id;

    let order = store.place(draft_for(vec![line(&product, 0, 3)])).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_cents, 3 * 2999);
    assert!(order.order_number.starts_with(order_number::ORDER_NUMBER_PREFIX));
    assert_eq!(order.items.len(), 1);
    assert_eq!(store.stock_of(variant).await.unwrap(), Some(7));
}

#[tokio::test]
async fn insufficient_stock_names_the_shortfall_and_changes_nothing() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[2])).await.unwrap();
    let variant = product.variants[0].id;

    let err = store
        .place(draft_for(vec![line(&product, 0, 5)]))
        .await
        .unwrap_err();

    match err {
        PlaceOrderError::InsufficientStock { shortages } => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].variant_id, variant);
            assert_eq!(shortages[0].requested, 5);
            assert_eq!(shortages[0].available, 2);
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(store.stock_of(variant).await.unwrap(), Some(2));
    assert!(OrderRepo::list(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn multi_line_placement_is_all_or_nothing() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10, 1])).await.unwrap();

    let err = store
        .place(draft_for(vec![line(&product, 0, 4), line(&product, 1, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, PlaceOrderError::InsufficientStock { .. }));
    // The satisfiable first line must not have been applied.
    assert_eq!(
        store.stock_of(product.variants[0].id).await.unwrap(),
        Some(10)
    );
    assert_eq!(
        store.stock_of(product.variants[1].id).await.unwrap(),
        Some(1)
    );
}

#[tokio::test]
async fn unknown_variant_is_rejected_before_any_write() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[5])).await.unwrap();

    let mut bad = line(&product, 0, 1);
    let ghost = VariantId::new();
    bad.variant_id = Some(ghost);

    let err = store.place(draft_for(vec![bad])).await.unwrap_err();
    assert_eq!(err, PlaceOrderError::VariantNotFound { variant_id: ghost });
    assert_eq!(store.stock_of(product.variants[0].id).await.unwrap(), Some(5));
}

#[tokio::test]
async fn caller_supplied_order_number_must_be_unique() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();

    let mut draft = draft_for(vec![line(&product, 0, 1)]);
    draft.order_number = Some("ORD-CUSTOM-1".to_string());
    store.place(draft.clone()).await.unwrap();

    let err = store.place(draft).await.unwrap_err();
    assert_eq!(
        err,
        PlaceOrderError::DuplicateOrderNumber("ORD-CUSTOM-1".to_string())
    );
    // The duplicate attempt must not have touched stock.
    assert_eq!(store.stock_of(product.variants[0].id).await.unwrap(), Some(9));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placements_never_oversell() {
    let store = Arc::new(MemoryStore::new());
    let product = store.create(new_product(&[5])).await.unwrap();
    let variant = product.variants[0].id;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            store.place(draft_for(vec![line(&product, 0, 1)])).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            placed += 1;
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(store.stock_of(variant).await.unwrap(), Some(0));
    assert_eq!(OrderRepo::list(&*store).await.unwrap().len(), 5);
}

#[tokio::test]
async fn generated_order_numbers_are_distinct() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();

    let a = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();
    let b = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();
    assert_ne!(a.order_number, b.order_number);
}

#[tokio::test]
async fn shipped_and_delivered_stamp_their_timestamps() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();
    let order = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();
    let by_id = OrderRef::from_id(order.id);

    let change = store.set_status(&by_id, OrderStatus::Processing).await.unwrap();
    assert_eq!(change.previous, OrderStatus::Pending);
    assert!(change.order.tracking.shipped_at.is_none());

    let change = store.set_status(&by_id, OrderStatus::Shipped).await.unwrap();
    assert_eq!(change.previous, OrderStatus::Processing);
    assert!(change.order.tracking.shipped_at.is_some());
    assert!(change.order.tracking.delivered_at.is_none());

    let change = store.set_status(&by_id, OrderStatus::Delivered).await.unwrap();
    assert!(change.order.tracking.delivered_at.is_some());
}

#[tokio::test]
async fn orders_are_found_by_id_number_and_phone() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();
    let order = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();

    let by_id = store
        .find(&OrderRef::from_id(order.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.id, order.id);

    let by_number = store
        .find(&OrderRef::parse(&order.order_number))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, order.id);

    let by_phone = store.find_by_phone("+20100000000").await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert!(store.find_by_phone("+20199999999").await.unwrap().is_empty());
}

#[tokio::test]
async fn deletion_works_by_id_or_number_and_missing_is_not_found() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();

    let a = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();
    let b = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();

    OrderRepo::delete(&store, &OrderRef::from_id(a.id))
        .await
        .unwrap();
    OrderRepo::delete(&store, &OrderRef::parse(&b.order_number))
        .await
        .unwrap();
    assert!(OrderRepo::list(&store).await.unwrap().is_empty());

    let err = OrderRepo::delete(&store, &OrderRef::from_id(a.id))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound);
}

#[tokio::test]
async fn uuid_shaped_order_number_still_resolves_by_number() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();

    // A caller-supplied order number that is itself a valid UUID must stay
    // reachable by number even though it parses as an id.
    let number = savx_core::OrderId::new().to_string();
    let mut draft = draft_for(vec![line(&product, 0, 1)]);
    draft.order_number = Some(number.clone());
    let order = store.place(draft).await.unwrap();
    assert_ne!(order.id.to_string(), number);

    let by_ref = OrderRef::parse(&number);
    let found = store.find(&by_ref).await.unwrap().unwrap();
    assert_eq!(found.id, order.id);

    let change = store
        .set_status(&by_ref, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(change.previous, OrderStatus::Pending);

    OrderRepo::delete(&store, &by_ref).await.unwrap();
    assert!(store.find(&by_ref).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_status_updates_report_a_consistent_chain() {
    let store = Arc::new(MemoryStore::new());
    let product = store.create(new_product(&[5])).await.unwrap();
    let order = store.place(draft_for(vec![line(&product, 0, 1)])).await.unwrap();

    let first = {
        let store = Arc::clone(&store);
        let by_ref = OrderRef::from_id(order.id);
        tokio::spawn(async move { store.set_status(&by_ref, OrderStatus::Processing).await })
    };
    let second = {
        let store = Arc::clone(&store);
        let by_ref = OrderRef::from_id(order.id);
        tokio::spawn(async move { store.set_status(&by_ref, OrderStatus::Shipped).await })
    };

    let a = first.await.unwrap().unwrap().previous;
    let b = second.await.unwrap().unwrap().previous;

    // Exactly one transition observed the initial state; the other must have
    // observed its peer's result, never a stale read.
    assert!((a == OrderStatus::Pending) != (b == OrderStatus::Pending));
    assert!(a == OrderStatus::Pending || a == OrderStatus::Shipped);
    assert!(b == OrderStatus::Pending || b == OrderStatus::Processing);
}

#[tokio::test]
async fn cart_add_merges_same_triple_and_clear_reports_count() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10, 10])).await.unwrap();
    let user = UserId::new();

    let first = store
        .add(NewCartLine {
            user_id: user,
            product_id: product.id,
            variant_id: product.variants[0].id,
            quantity: 2,
        })
        .await
        .unwrap();
    let merged = store
        .add(NewCartLine {
            user_id: user,
            product_id: product.id,
            variant_id: product.variants[0].id,
            quantity: 3,
        })
        .await
        .unwrap();
    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity, 5);

    store
        .add(NewCartLine {
            user_id: user,
            product_id: product.id,
            variant_id: product.variants[1].id,
            quantity: 1,
        })
        .await
        .unwrap();

    let details = store.lines_for(user).await.unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0].unit_price_cents, 2999);
    assert_eq!(details[0].product_name, "Modern Black Watch");

    assert_eq!(store.clear(user).await.unwrap(), 2);
    assert!(store.lines_for(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn product_update_replaces_variants_and_delete_cascades_cart() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[10])).await.unwrap();
    let user = UserId::new();
    store
        .add(NewCartLine {
            user_id: user,
            product_id: product.id,
            variant_id: product.variants[0].id,
            quantity: 1,
        })
        .await
        .unwrap();

    let updated = store
        .update(
            product.id,
            ProductUpdate {
                price_cents: Some(3999),
                variants: Some(vec![NewVariant {
                    color_name: "Silver".to_string(),
                    color_code: "#c0c0c0".to_string(),
                    price_cents: None,
                    stock: 4,
                    image: None,
                }]),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price_cents, 3999);
    assert_eq!(updated.variants.len(), 1);
    assert_eq!(updated.total_stock(), 4);

    ProductRepo::delete(&store, product.id).await.unwrap();
    assert!(store.lines_for(user).await.unwrap().is_empty());
    assert_eq!(store.get(product.id).await.unwrap(), None);
}

#[tokio::test]
async fn disabled_products_are_hidden_from_storefront_listing() {
    let store = MemoryStore::new();
    let product = store.create(new_product(&[1])).await.unwrap();
    store
        .update(
            product.id,
            ProductUpdate {
                disabled: Some(true),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();

    assert!(ProductRepo::list(&store, None, false).await.unwrap().is_empty());
    assert_eq!(ProductRepo::list(&store, None, true).await.unwrap().len(), 1);
    assert_eq!(
        ProductRepo::list(&store, Some("watches"), true)
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(ProductRepo::list(&store, Some("shoes"), true)
        .await
        .unwrap()
        .is_empty());
}

mod stock_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Stock never goes negative no matter what sequence of decrements
        // is attempted, and a decrement applies exactly when covered.
        #[test]
        fn conditional_decrement_never_drives_stock_negative(
            initial in 0i64..50,
            requests in proptest::collection::vec(1i64..20, 1..12),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let product = store.create(new_product(&[initial])).await.unwrap();
                let variant = product.variants[0].id;

                let mut remaining = initial;
                for qty in requests {
                    let applied = store.conditional_decrement(variant, qty).await.unwrap();
                    prop_assert_eq!(applied, remaining >= qty);
                    if applied {
                        remaining -= qty;
                    }
                    let stock = store.stock_of(variant).await.unwrap().unwrap();
                    prop_assert_eq!(stock, remaining);
                    prop_assert!(stock >= 0);
                }
                Ok(())
            })?;
        }
    }
}
