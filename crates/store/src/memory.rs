//! In-memory backend for dev and tests.
//!
//! Implements the same contracts as the Postgres backend, including the
//! conditional-decrement semantics of the inventory ledger. All state lives
//! behind one mutex, so a whole order placement is atomic with respect to
//! concurrent placements — which is exactly the all-or-nothing visibility
//! the transactional backend provides.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use savx_carts::{CartLine, CartLineDetail, NewCartLine};
use savx_catalog::{NewProduct, Product, ProductUpdate, Variant};
use savx_core::{order_number, CartLineId, OrderId, ProductId, UserId, VariantId};
use savx_orders::{
    Order, OrderDraft, OrderStatus, PlaceOrderError, Shortage, StatusChange, StatusStamp, Tracking,
};

use crate::error::StoreError;
use crate::repo::{CartRepo, InventoryLedger, OrderRef, OrderRepo, ProductRepo};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    cart: Vec<CartLine>,
    orders: Vec<Order>,
}

impl State {
    fn variant_stock(&self, variant: VariantId) -> Option<i64> {
        self.products
            .values()
            .flat_map(|p| p.variants.iter())
            .find(|v| v.id == variant)
            .map(|v| v.stock)
    }

    /// Conditional decrement: applies only when stock >= quantity.
    fn try_decrement(&mut self, variant: VariantId, quantity: i64) -> bool {
        for product in self.products.values_mut() {
            if let Some(v) = product.variants.iter_mut().find(|v| v.id == variant) {
                if v.stock >= quantity {
                    v.stock -= quantity;
                    return true;
                }
                return false;
            }
        }
        false
    }

    fn restore_stock(&mut self, variant: VariantId, quantity: i64) {
        for product in self.products.values_mut() {
            if let Some(v) = product.variants.iter_mut().find(|v| v.id == variant) {
                v.stock += quantity;
                return;
            }
        }
    }

    fn order_index(&self, order: &OrderRef) -> Option<usize> {
        self.orders.iter().position(|o| {
            order.id().is_some_and(|id| o.id == id) || o.order_number == order.as_str()
        })
    }
}

/// In-memory store implementing every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn list(
        &self,
        category: Option<&str>,
        include_disabled: bool,
    ) -> Result<Vec<Product>, StoreError> {
        let state = self.lock();
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| include_disabled || !p.disabled)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        products.sort_by_key(|p| *p.id.as_uuid());
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError> {
        let id = ProductId::new();
        let product = Product {
            id,
            name: new.name,
            price_cents: new.price_cents,
            category: new.category,
            description: new.description,
            image: new.image,
            disabled: false,
            discount_percent: new.discount_percent,
            original_price_cents: new.original_price_cents,
            variants: new
                .variants
                .into_iter()
                .map(|v| Variant {
                    id: VariantId::new(),
                    product_id: id,
                    color_name: v.color_name,
                    color_code: v.color_code,
                    price_cents: v.price_cents,
                    stock: v.stock,
                    image: v.image,
                })
                .collect(),
        };
        self.lock().products.insert(id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        let mut state = self.lock();
        let product = state.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(price) = update.price_cents {
            product.price_cents = price;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(image) = update.image {
            product.image = Some(image);
        }
        if let Some(disabled) = update.disabled {
            product.disabled = disabled;
        }
        if let Some(pct) = update.discount_percent {
            product.discount_percent = Some(pct);
        }
        if let Some(orig) = update.original_price_cents {
            product.original_price_cents = Some(orig);
        }
        if let Some(variants) = update.variants {
            product.variants = variants
                .into_iter()
                .map(|v| Variant {
                    id: VariantId::new(),
                    product_id: id,
                    color_name: v.color_name,
                    color_code: v.color_code,
                    price_cents: v.price_cents,
                    stock: v.stock,
                    image: v.image,
                })
                .collect();
        }
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.products.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        // Matches the Postgres ON DELETE CASCADE on cart lines.
        state.cart.retain(|l| l.product_id != id);
        Ok(())
    }
}

#[async_trait]
impl CartRepo for MemoryStore {
    async fn lines_for(&self, user: UserId) -> Result<Vec<CartLineDetail>, StoreError> {
        let state = self.lock();
        let mut details = Vec::new();
        for line in state.cart.iter().filter(|l| l.user_id == user) {
            let Some(product) = state.products.get(&line.product_id) else {
                continue;
            };
            let Some(variant) = product.variant(line.variant_id) else {
                continue;
            };
            details.push(CartLineDetail {
                line: line.clone(),
                product_name: product.name.clone(),
                color_name: variant.color_name.clone(),
                unit_price_cents: variant.effective_price_cents(product.price_cents),
                image: variant.image.clone().or_else(|| product.image.clone()),
            });
        }
        Ok(details)
    }

    async fn add(&self, new: NewCartLine) -> Result<CartLine, StoreError> {
        let mut state = self.lock();
        if let Some(existing) = state.cart.iter_mut().find(|l| l.merges_with(&new)) {
            existing.quantity = existing.merged_quantity(new.quantity);
            return Ok(existing.clone());
        }
        let line = CartLine {
            id: CartLineId::new(),
            user_id: new.user_id,
            product_id: new.product_id,
            variant_id: new.variant_id,
            quantity: new.quantity,
            added_at: Utc::now(),
        };
        state.cart.push(line.clone());
        Ok(line)
    }

    async fn set_quantity(&self, id: CartLineId, quantity: i64) -> Result<CartLine, StoreError> {
        let mut state = self.lock();
        let line = state
            .cart
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound)?;
        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn remove(&self, id: CartLineId) -> Result<(), StoreError> {
        let mut state = self.lock();
        let before = state.cart.len();
        state.cart.retain(|l| l.id != id);
        if state.cart.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let before = state.cart.len();
        state.cart.retain(|l| l.user_id != user);
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn stock_of(&self, variant: VariantId) -> Result<Option<i64>, StoreError> {
        Ok(self.lock().variant_stock(variant))
    }

    async fn conditional_decrement(
        &self,
        variant: VariantId,
        quantity: i64,
    ) -> Result<bool, StoreError> {
        Ok(self.lock().try_decrement(variant, quantity))
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn place(&self, draft: OrderDraft) -> Result<Order, PlaceOrderError> {
        let validated = draft.validate()?;
        let mut state = self.lock();

        // Pre-check: per-line stock reads, collecting every shortfall so the
        // customer sees the full picture in one rejection.
        let mut shortages = Vec::new();
        for line in &validated {
            let available = state
                .variant_stock(line.variant_id)
                .ok_or(PlaceOrderError::VariantNotFound {
                    variant_id: line.variant_id,
                })?;
            if available < line.quantity {
                shortages.push(Shortage {
                    variant_id: line.variant_id,
                    product_name: line.product_name.clone(),
                    requested: line.quantity,
                    available,
                });
            }
        }
        if !shortages.is_empty() {
            return Err(PlaceOrderError::InsufficientStock { shortages });
        }

        let number = draft
            .order_number
            .clone()
            .unwrap_or_else(order_number::generate);
        if state.orders.iter().any(|o| o.order_number == number) {
            return Err(PlaceOrderError::DuplicateOrderNumber(number));
        }

        // Write phase: conditional decrement per line, first failure aborts
        // and restores the decrements already applied.
        let mut applied: Vec<(VariantId, i64)> = Vec::new();
        for line in &validated {
            if state.try_decrement(line.variant_id, line.quantity) {
                applied.push((line.variant_id, line.quantity));
                continue;
            }
            let available = state.variant_stock(line.variant_id).unwrap_or(0);
            tracing::warn!(
                variant_id = %line.variant_id,
                requested = line.quantity,
                available,
                "conditional decrement lost a race after pre-check; aborting placement"
            );
            for (variant, quantity) in applied {
                state.restore_stock(variant, quantity);
            }
            return Err(PlaceOrderError::InsufficientStock {
                shortages: vec![Shortage {
                    variant_id: line.variant_id,
                    product_name: line.product_name.clone(),
                    requested: line.quantity,
                    available,
                }],
            });
        }

        let order = Order {
            id: OrderId::new(),
            order_number: number,
            total_cents: draft.total_cents(),
            status: OrderStatus::Pending,
            placed_at: Utc::now(),
            customer: draft.customer,
            shipping: draft.shipping,
            tracking: Tracking::default(),
            items: validated
                .into_iter()
                .map(|l| savx_orders::OrderLineItem {
                    product_id: l.product_id,
                    variant_id: l.variant_id,
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    product_name: l.product_name,
                    color_name: l.color_name,
                })
                .collect(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let state = self.lock();
        let mut orders = state.orders.clone();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(orders)
    }

    async fn find(&self, order: &OrderRef) -> Result<Option<Order>, StoreError> {
        let state = self.lock();
        Ok(state.order_index(order).map(|i| state.orders[i].clone()))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, StoreError> {
        let state = self.lock();
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.customer.phone == phone)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        Ok(orders)
    }

    async fn set_status(
        &self,
        order: &OrderRef,
        status: OrderStatus,
    ) -> Result<StatusChange, StoreError> {
        let mut state = self.lock();
        let idx = state.order_index(order).ok_or(StoreError::NotFound)?;
        let previous = state.orders[idx].status;
        state.orders[idx].status = status;
        match status.stamp() {
            Some(StatusStamp::ShippedAt) => state.orders[idx].tracking.shipped_at = Some(Utc::now()),
            Some(StatusStamp::DeliveredAt) => {
                state.orders[idx].tracking.delivered_at = Some(Utc::now())
            }
            None => {}
        }
        Ok(StatusChange {
            order: state.orders[idx].clone(),
            previous,
        })
    }

    async fn delete(&self, order: &OrderRef) -> Result<(), StoreError> {
        let mut state = self.lock();
        let idx = state.order_index(order).ok_or(StoreError::NotFound)?;
        state.orders.remove(idx);
        Ok(())
    }
}
