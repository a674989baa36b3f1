//! Postgres backend.
//!
//! Order placement runs inside one explicit transaction: the order header,
//! its line items and every stock decrement commit together or not at all.
//! The conditional `UPDATE ... WHERE stock >= quantity` is the authoritative
//! oversell guard; the earlier per-line stock read only exists to produce a
//! detailed rejection before any write happens.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use savx_carts::{CartLine, CartLineDetail, NewCartLine};
use savx_catalog::{NewProduct, Product, ProductUpdate, Variant};
use savx_core::{order_number, CartLineId, OrderId, ProductId, UserId, VariantId};
use savx_orders::{
    CustomerInfo, Order, OrderDraft, OrderLineItem, OrderStatus, PlaceOrderError, ShippingInfo,
    Shortage, StatusChange, StatusStamp, Tracking, ValidatedLine,
};

use crate::error::{is_unique_violation, map_sqlx_error, StoreError};
use crate::repo::{CartRepo, InventoryLedger, OrderRef, OrderRepo, ProductRepo};

/// Postgres-backed store implementing every repository trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and run the idempotent schema migration.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../migrations/0001_init.sql"))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Shared connection pool, for callers that need their own queries.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn variants_of(&self, product_ids: &[Uuid]) -> Result<Vec<Variant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, color_name, color_code, price_cents, stock, image
            FROM variants
            WHERE product_id = ANY($1)
            ORDER BY color_name ASC
            "#,
        )
        .bind(product_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("variants_of", e))?;

        rows.iter()
            .map(|row| {
                VariantRow::from_row(row)
                    .map(Variant::from)
                    .map_err(|e| StoreError::Backend(format!("variant row decode: {e}")))
            })
            .collect()
    }

    async fn resolve_order_id(&self, order: &OrderRef) -> Result<Option<OrderId>, StoreError> {
        // A UUID-shaped reference may be an internal id or a caller-supplied
        // order number, so both columns are checked.
        let row = sqlx::query("SELECT id FROM orders WHERE id = $1 OR order_number = $2")
            .bind(order.id().map(|id| *id.as_uuid()))
            .bind(order.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("resolve_order_id", e))?;

        match row {
            Some(row) => {
                let id: Uuid = row
                    .try_get("id")
                    .map_err(|e| StoreError::Backend(format!("order id decode: {e}")))?;
                Ok(Some(OrderId::from_uuid(id)))
            }
            None => Ok(None),
        }
    }

    async fn load_order(&self, id: OrderId) -> Result<Order, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, total_cents, status, placed_at,
                   customer_name, customer_email, customer_phone,
                   ship_address, ship_city, ship_governorate, ship_notes,
                   tracking_number, estimated_delivery, shipped_at, delivered_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order", e))?;

        let header = OrderRow::from_row(&row)
            .map_err(|e| StoreError::Backend(format!("order row decode: {e}")))?;
        let items = self.items_of(&[*id.as_uuid()]).await?;
        Ok(header.into_order(items.into_iter().map(|(_, item)| item).collect()))
    }

    async fn items_of(
        &self,
        order_ids: &[Uuid],
    ) -> Result<Vec<(OrderId, OrderLineItem)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, variant_id, quantity, unit_price_cents,
                   product_name, color_name
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY product_name ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("items_of", e))?;

        rows.iter()
            .map(|row| {
                OrderItemRow::from_row(row)
                    .map(OrderItemRow::into_pair)
                    .map_err(|e| StoreError::Backend(format!("order item row decode: {e}")))
            })
            .collect()
    }

    async fn load_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        let headers: Vec<OrderRow> = rows
            .iter()
            .map(|row| {
                OrderRow::from_row(row)
                    .map_err(|e| StoreError::Backend(format!("order row decode: {e}")))
            })
            .collect::<Result<_, _>>()?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut items = self.items_of(&ids).await?;

        Ok(headers
            .into_iter()
            .map(|header| {
                let own: Vec<OrderLineItem> = items
                    .iter()
                    .filter(|(oid, _)| *oid.as_uuid() == header.id)
                    .map(|(_, item)| item.clone())
                    .collect();
                items.retain(|(oid, _)| *oid.as_uuid() != header.id);
                header.into_order(own)
            })
            .collect())
    }
}

#[async_trait]
impl ProductRepo for PgStore {
    async fn list(
        &self,
        category: Option<&str>,
        include_disabled: bool,
    ) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price_cents, category, description, image,
                   disabled, discount_percent, original_price_cents
            FROM products
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2 OR NOT disabled)
            ORDER BY id ASC
            "#,
        )
        .bind(category)
        .bind(include_disabled)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut products: Vec<Product> = rows
            .iter()
            .map(|row| {
                ProductRow::from_row(row)
                    .map(|r| r.into_product(vec![]))
                    .map_err(|e| StoreError::Backend(format!("product row decode: {e}")))
            })
            .collect::<Result<_, _>>()?;

        let ids: Vec<Uuid> = products.iter().map(|p| *p.id.as_uuid()).collect();
        for variant in self.variants_of(&ids).await? {
            if let Some(product) = products.iter_mut().find(|p| p.id == variant.product_id) {
                product.variants.push(variant);
            }
        }
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price_cents, category, description, image,
                   disabled, discount_percent, original_price_cents
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = ProductRow::from_row(&row)
            .map_err(|e| StoreError::Backend(format!("product row decode: {e}")))?;
        let variants = self.variants_of(&[*id.as_uuid()]).await?;
        Ok(Some(header.into_product(variants)))
    }

    async fn create(&self, new: NewProduct) -> Result<Product, StoreError> {
        let id = ProductId::new();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;

        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, price_cents, category, description, image,
                 disabled, discount_percent, original_price_cents)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(new.price_cents)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.image)
        .bind(new.discount_percent)
        .bind(new.original_price_cents)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        let mut variants = Vec::with_capacity(new.variants.len());
        for v in new.variants {
            let variant = Variant {
                id: VariantId::new(),
                product_id: id,
                color_name: v.color_name,
                color_code: v.color_code,
                price_cents: v.price_cents,
                stock: v.stock,
                image: v.image,
            };
            insert_variant(&mut tx, &variant).await?;
            variants.push(variant);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;

        Ok(Product {
            id,
            name: new.name,
            price_cents: new.price_cents,
            category: new.category,
            description: new.description,
            image: new.image,
            disabled: false,
            discount_percent: new.discount_percent,
            original_price_cents: new.original_price_cents,
            variants,
        })
    }

    async fn update(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        let current = self.get(id).await?.ok_or(StoreError::NotFound)?;

        let mut product = current;
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price_cents = $3, category = $4, description = $5,
                image = $6, disabled = $7, discount_percent = $8,
                original_price_cents = $9
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.disabled)
        .bind(product.discount_percent)
        .bind(product.original_price_cents)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if let Some(new_variants) = update.variants {
            sqlx::query("DELETE FROM variants WHERE product_id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_product", e))?;

            product.variants = Vec::with_capacity(new_variants.len());
            for v in new_variants {
                let variant = Variant {
                    id: VariantId::new(),
                    product_id: id,
                    color_name: v.color_name,
                    color_code: v.color_code,
                    price_cents: v.price_cents,
                    stock: v.stock,
                    image: v.image,
                };
                insert_variant(&mut tx, &variant).await?;
                product.variants.push(variant);
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepo for PgStore {
    async fn lines_for(&self, user: UserId) -> Result<Vec<CartLineDetail>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_id, c.product_id, c.variant_id, c.quantity, c.added_at,
                   p.name AS product_name,
                   v.color_name,
                   COALESCE(v.price_cents, p.price_cents) AS unit_price_cents,
                   COALESCE(v.image, p.image) AS image
            FROM cart_lines c
            JOIN products p ON p.id = c.product_id
            JOIN variants v ON v.id = c.variant_id
            WHERE c.user_id = $1
            ORDER BY c.added_at ASC
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_lines_for", e))?;

        rows.iter()
            .map(|row| {
                let line = CartLineRow::from_row(row)
                    .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))?
                    .into();
                Ok(CartLineDetail {
                    line,
                    product_name: row
                        .try_get("product_name")
                        .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))?,
                    color_name: row
                        .try_get("color_name")
                        .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))?,
                    unit_price_cents: row
                        .try_get("unit_price_cents")
                        .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))?,
                    image: row
                        .try_get("image")
                        .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))?,
                })
            })
            .collect()
    }

    async fn add(&self, new: NewCartLine) -> Result<CartLine, StoreError> {
        // Same (user, product, variant) triple merges quantities instead of
        // duplicating the row.
        let row = sqlx::query(
            r#"
            INSERT INTO cart_lines (id, user_id, product_id, variant_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (user_id, product_id, variant_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, variant_id, quantity, added_at
            "#,
        )
        .bind(CartLineId::new().as_uuid())
        .bind(new.user_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .bind(new.variant_id.as_uuid())
        .bind(new.quantity)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_add", e))?;

        CartLineRow::from_row(&row)
            .map(CartLine::from)
            .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))
    }

    async fn set_quantity(&self, id: CartLineId, quantity: i64) -> Result<CartLine, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE cart_lines SET quantity = $2
            WHERE id = $1
            RETURNING id, user_id, product_id, variant_id, quantity, added_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_set_quantity", e))?
        .ok_or(StoreError::NotFound)?;

        CartLineRow::from_row(&row)
            .map(CartLine::from)
            .map_err(|e| StoreError::Backend(format!("cart row decode: {e}")))
    }

    async fn remove(&self, id: CartLineId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cart_remove", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cart_clear", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl InventoryLedger for PgStore {
    async fn stock_of(&self, variant: VariantId) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT stock FROM variants WHERE id = $1")
            .bind(variant.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stock_of", e))?;
        match row {
            Some(row) => Ok(Some(row.try_get("stock").map_err(|e| {
                StoreError::Backend(format!("stock decode: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    async fn conditional_decrement(
        &self,
        variant: VariantId,
        quantity: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(variant.as_uuid())
        .bind(quantity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("conditional_decrement", e))?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderRepo for PgStore {
    #[instrument(skip(self, draft), fields(lines = draft.lines.len()), err)]
    async fn place(&self, draft: OrderDraft) -> Result<Order, PlaceOrderError> {
        let validated = draft.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("place_order", e))?;

        // Pre-check reads inside the transaction, collecting every shortfall
        // so the rejection names all problem lines at once.
        let mut shortages = Vec::new();
        for line in &validated {
            let row = sqlx::query("SELECT stock FROM variants WHERE id = $1")
                .bind(line.variant_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| storage("place_order", e))?;
            let Some(row) = row else {
                return Err(PlaceOrderError::VariantNotFound {
                    variant_id: line.variant_id,
                });
            };
            let available: i64 = row
                .try_get("stock")
                .map_err(|e| PlaceOrderError::Storage(format!("stock decode: {e}")))?;
            if available < line.quantity {
                shortages.push(shortage(line, available));
            }
        }
        if !shortages.is_empty() {
            return Err(PlaceOrderError::InsufficientStock { shortages });
        }

        let id = OrderId::new();
        let number = draft
            .order_number
            .clone()
            .unwrap_or_else(order_number::generate);
        let placed_at = chrono::Utc::now();

        let insert = sqlx::query(
            r#"
            INSERT INTO orders
                (id, order_number, total_cents, status, placed_at,
                 customer_name, customer_email, customer_phone,
                 ship_address, ship_city, ship_governorate, ship_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&number)
        .bind(draft.total_cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(placed_at)
        .bind(&draft.customer.full_name)
        .bind(&draft.customer.email)
        .bind(&draft.customer.phone)
        .bind(&draft.shipping.address)
        .bind(&draft.shipping.city)
        .bind(&draft.shipping.governorate)
        .bind(&draft.shipping.notes)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(PlaceOrderError::DuplicateOrderNumber(number));
            }
            return Err(storage("place_order", err));
        }

        for line in &validated {
            // The sole oversell guard: decrement applies only when enough
            // stock remains, observed through the affected-row count.
            let result = sqlx::query(
                "UPDATE variants SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.variant_id.as_uuid())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("place_order", e))?;

            if result.rows_affected() == 0 {
                let available = sqlx::query("SELECT stock FROM variants WHERE id = $1")
                    .bind(line.variant_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .ok()
                    .flatten()
                    .and_then(|row| row.try_get("stock").ok())
                    .unwrap_or(0);
                tracing::warn!(
                    variant_id = %line.variant_id,
                    requested = line.quantity,
                    available,
                    "conditional decrement lost a race after pre-check; aborting placement"
                );
                tx.rollback().await.map_err(|e| storage("place_order", e))?;
                return Err(PlaceOrderError::InsufficientStock {
                    shortages: vec![shortage(line, available)],
                });
            }

            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, product_id, variant_id, quantity,
                     unit_price_cents, product_name, color_name)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(line.variant_id.as_uuid())
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(&line.product_name)
            .bind(&line.color_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("place_order", e))?;
        }

        tx.commit().await.map_err(|e| storage("place_order", e))?;

        Ok(Order {
            id,
            order_number: number,
            total_cents: draft.total_cents(),
            status: OrderStatus::Pending,
            placed_at,
            customer: draft.customer,
            shipping: draft.shipping,
            tracking: Tracking::default(),
            items: validated
                .into_iter()
                .map(|l| OrderLineItem {
                    product_id: l.product_id,
                    variant_id: l.variant_id,
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    product_name: l.product_name,
                    color_name: l.color_name,
                })
                .collect(),
        })
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, total_cents, status, placed_at,
                   customer_name, customer_email, customer_phone,
                   ship_address, ship_city, ship_governorate, ship_notes,
                   tracking_number, estimated_delivery, shipped_at, delivered_at
            FROM orders
            ORDER BY placed_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        self.load_orders(rows).await
    }

    async fn find(&self, order: &OrderRef) -> Result<Option<Order>, StoreError> {
        match self.resolve_order_id(order).await? {
            Some(id) => Ok(Some(self.load_order(id).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, total_cents, status, placed_at,
                   customer_name, customer_email, customer_phone,
                   ship_address, ship_city, ship_governorate, ship_notes,
                   tracking_number, estimated_delivery, shipped_at, delivered_at
            FROM orders
            WHERE customer_phone = $1
            ORDER BY placed_at DESC
            "#,
        )
        .bind(phone)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_phone", e))?;
        self.load_orders(rows).await
    }

    #[instrument(skip(self), fields(status = %status), err)]
    async fn set_status(
        &self,
        order: &OrderRef,
        status: OrderStatus,
    ) -> Result<StatusChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("set_status", e))?;

        // Row lock: the reported previous status and the update must not be
        // interleaved with a concurrent transition.
        let row = sqlx::query(
            "SELECT id, status FROM orders WHERE id = $1 OR order_number = $2 FOR UPDATE",
        )
        .bind(order.id().map(|id| *id.as_uuid()))
        .bind(order.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("set_status", e))?
        .ok_or(StoreError::NotFound)?;

        let id: Uuid = row
            .try_get("id")
            .map_err(|e| StoreError::Backend(format!("order id decode: {e}")))?;
        let id = OrderId::from_uuid(id);
        let previous_raw: String = row
            .try_get("status")
            .map_err(|e| StoreError::Backend(format!("status decode: {e}")))?;
        let previous = OrderStatus::from_str(&previous_raw)
            .map_err(|e| StoreError::Backend(format!("stored status invalid: {e}")))?;

        let query = match status.stamp() {
            Some(StatusStamp::ShippedAt) => {
                "UPDATE orders SET status = $2, shipped_at = now() WHERE id = $1"
            }
            Some(StatusStamp::DeliveredAt) => {
                "UPDATE orders SET status = $2, delivered_at = now() WHERE id = $1"
            }
            None => "UPDATE orders SET status = $2 WHERE id = $1",
        };
        sqlx::query(query)
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_status", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("set_status", e))?;

        Ok(StatusChange {
            order: self.load_order(id).await?,
            previous,
        })
    }

    async fn delete(&self, order: &OrderRef) -> Result<(), StoreError> {
        let id = self
            .resolve_order_id(order)
            .await?
            .ok_or(StoreError::NotFound)?;
        // Line items go with the header via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn storage(operation: &str, err: sqlx::Error) -> PlaceOrderError {
    PlaceOrderError::Storage(map_sqlx_error(operation, err).to_string())
}

fn shortage(line: &ValidatedLine, available: i64) -> Shortage {
    Shortage {
        variant_id: line.variant_id,
        product_name: line.product_name.clone(),
        requested: line.quantity,
        available,
    }
}

async fn insert_variant(
    tx: &mut Transaction<'_, Postgres>,
    variant: &Variant,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO variants (id, product_id, color_name, color_code, price_cents, stock, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(variant.id.as_uuid())
    .bind(variant.product_id.as_uuid())
    .bind(&variant.color_name)
    .bind(&variant.color_code)
    .bind(variant.price_cents)
    .bind(variant.stock)
    .bind(&variant.image)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_variant", e))?;
    Ok(())
}

struct ProductRow {
    id: Uuid,
    name: String,
    price_cents: i64,
    category: String,
    description: String,
    image: Option<String>,
    disabled: bool,
    discount_percent: Option<i64>,
    original_price_cents: Option<i64>,
}

impl FromRow<'_, PgRow> for ProductRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price_cents: row.try_get("price_cents")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            disabled: row.try_get("disabled")?,
            discount_percent: row.try_get("discount_percent")?,
            original_price_cents: row.try_get("original_price_cents")?,
        })
    }
}

impl ProductRow {
    fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: ProductId::from_uuid(self.id),
            name: self.name,
            price_cents: self.price_cents,
            category: self.category,
            description: self.description,
            image: self.image,
            disabled: self.disabled,
            discount_percent: self.discount_percent,
            original_price_cents: self.original_price_cents,
            variants,
        }
    }
}

struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    color_name: String,
    color_code: String,
    price_cents: Option<i64>,
    stock: i64,
    image: Option<String>,
}

impl FromRow<'_, PgRow> for VariantRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            color_name: row.try_get("color_name")?,
            color_code: row.try_get("color_code")?,
            price_cents: row.try_get("price_cents")?,
            stock: row.try_get("stock")?,
            image: row.try_get("image")?,
        })
    }
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            id: VariantId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            color_name: row.color_name,
            color_code: row.color_code,
            price_cents: row.price_cents,
            stock: row.stock,
            image: row.image,
        }
    }
}

struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Uuid,
    quantity: i64,
    added_at: chrono::DateTime<chrono::Utc>,
}

impl FromRow<'_, PgRow> for CartLineRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            variant_id: row.try_get("variant_id")?,
            quantity: row.try_get("quantity")?,
            added_at: row.try_get("added_at")?,
        })
    }
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: CartLineId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            product_id: ProductId::from_uuid(row.product_id),
            variant_id: VariantId::from_uuid(row.variant_id),
            quantity: row.quantity,
            added_at: row.added_at,
        }
    }
}

struct OrderRow {
    id: Uuid,
    order_number: String,
    total_cents: i64,
    status: OrderStatus,
    placed_at: chrono::DateTime<chrono::Utc>,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    ship_address: String,
    ship_city: String,
    ship_governorate: String,
    ship_notes: Option<String>,
    tracking_number: Option<String>,
    estimated_delivery: Option<chrono::NaiveDate>,
    shipped_at: Option<chrono::DateTime<chrono::Utc>>,
    delivered_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl FromRow<'_, PgRow> for OrderRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let raw_status: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&raw_status).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            }
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            total_cents: row.try_get("total_cents")?,
            status,
            placed_at: row.try_get("placed_at")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            ship_address: row.try_get("ship_address")?,
            ship_city: row.try_get("ship_city")?,
            ship_governorate: row.try_get("ship_governorate")?,
            ship_notes: row.try_get("ship_notes")?,
            tracking_number: row.try_get("tracking_number")?,
            estimated_delivery: row.try_get("estimated_delivery")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderLineItem>) -> Order {
        Order {
            id: OrderId::from_uuid(self.id),
            order_number: self.order_number,
            total_cents: self.total_cents,
            status: self.status,
            placed_at: self.placed_at,
            customer: CustomerInfo {
                full_name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            shipping: ShippingInfo {
                address: self.ship_address,
                city: self.ship_city,
                governorate: self.ship_governorate,
                notes: self.ship_notes,
            },
            tracking: Tracking {
                tracking_number: self.tracking_number,
                estimated_delivery: self.estimated_delivery,
                shipped_at: self.shipped_at,
                delivered_at: self.delivered_at,
            },
            items,
        }
    }
}

struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    variant_id: Uuid,
    quantity: i64,
    unit_price_cents: i64,
    product_name: String,
    color_name: String,
}

impl FromRow<'_, PgRow> for OrderItemRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            variant_id: row.try_get("variant_id")?,
            quantity: row.try_get("quantity")?,
            unit_price_cents: row.try_get("unit_price_cents")?,
            product_name: row.try_get("product_name")?,
            color_name: row.try_get("color_name")?,
        })
    }
}

impl OrderItemRow {
    fn into_pair(self) -> (OrderId, OrderLineItem) {
        (
            OrderId::from_uuid(self.order_id),
            OrderLineItem {
                product_id: ProductId::from_uuid(self.product_id),
                variant_id: VariantId::from_uuid(self.variant_id),
                quantity: self.quantity,
                unit_price_cents: self.unit_price_cents,
                product_name: self.product_name,
                color_name: self.color_name,
            },
        )
    }
}
