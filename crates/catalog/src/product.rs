use serde::{Deserialize, Serialize};

use savx_core::{DomainError, DomainResult, ProductId, VariantId};

/// A purchasable SKU under a product: one color with its own price,
/// stock counter and image.
///
/// The variant stock counter is the sole authoritative quantity-on-hand
/// for that SKU. It is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub color_name: String,
    /// Swatch code, e.g. `#1a1a1a`.
    pub color_code: String,
    /// Overrides the product price when set. Smallest currency unit (cents).
    pub price_cents: Option<i64>,
    pub stock: i64,
    pub image: Option<String>,
}

impl Variant {
    /// Effective unit price for this variant given its parent product.
    pub fn effective_price_cents(&self, product_price_cents: i64) -> i64 {
        self.price_cents.unwrap_or(product_price_cents)
    }
}

/// Catalog entry. Owns zero or more variants; the product-level stock
/// shown to customers is the sum of variant stocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Base price in smallest currency unit (cents).
    pub price_cents: i64,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub disabled: bool,
    /// Optional discount percentage (0..=100).
    pub discount_percent: Option<i64>,
    /// Pre-discount reference price, shown struck through.
    pub original_price_cents: Option<i64>,
    pub variants: Vec<Variant>,
}

impl Product {
    /// Total on-hand stock across all variants.
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// Payload for creating a product (admin action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub discount_percent: Option<i64>,
    pub original_price_cents: Option<i64>,
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub color_name: String,
    pub color_code: String,
    pub price_cents: Option<i64>,
    pub stock: i64,
    pub image: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.price_cents <= 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        if let Some(pct) = self.discount_percent {
            if !(0..=100).contains(&pct) {
                return Err(DomainError::validation(
                    "discount_percent must be within 0..=100",
                ));
            }
        }
        for v in &self.variants {
            v.validate()?;
        }
        Ok(())
    }
}

impl NewVariant {
    pub fn validate(&self) -> DomainResult<()> {
        if self.color_name.trim().is_empty() {
            return Err(DomainError::validation("variant color name cannot be empty"));
        }
        if self.stock < 0 {
            return Err(DomainError::invariant("variant stock cannot be negative"));
        }
        if let Some(p) = self.price_cents {
            if p <= 0 {
                return Err(DomainError::validation("variant price must be positive"));
            }
        }
        Ok(())
    }
}

/// Partial update of a product (admin action). Unset fields are left as-is;
/// `variants`, when present, replaces the full variant set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub disabled: Option<bool>,
    pub discount_percent: Option<i64>,
    pub original_price_cents: Option<i64>,
    pub variants: Option<Vec<NewVariant>>,
}

impl ProductUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
        }
        if let Some(p) = self.price_cents {
            if p <= 0 {
                return Err(DomainError::validation("price must be positive"));
            }
        }
        if let Some(pct) = self.discount_percent {
            if !(0..=100).contains(&pct) {
                return Err(DomainError::validation(
                    "discount_percent must be within 0..=100",
                ));
            }
        }
        if let Some(variants) = &self.variants {
            for v in variants {
                v.validate()?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Modern Black Watch".to_string(),
            price_cents: 2999,
            category: "watches".to_string(),
            description: "A modern black watch".to_string(),
            image: Some("assets/images/1.jpg".to_string()),
            discount_percent: None,
            original_price_cents: None,
            variants: vec![NewVariant {
                color_name: "Black".to_string(),
                color_code: "#000000".to_string(),
                price_cents: None,
                stock: 50,
                image: None,
            }],
        }
    }

    #[test]
    fn valid_product_passes_validation() {
        assert!(new_product().validate().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut p = new_product();
        p.name = "  ".to_string();
        assert!(matches!(
            p.validate().unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn negative_variant_stock_is_rejected() {
        let mut p = new_product();
        p.variants[0].stock = -1;
        assert!(matches!(
            p.validate().unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
    }

    #[test]
    fn discount_outside_range_is_rejected() {
        let mut p = new_product();
        p.discount_percent = Some(101);
        assert!(p.validate().is_err());
    }

    #[test]
    fn variant_price_overrides_product_price() {
        let v = Variant {
            id: VariantId::new(),
            product_id: ProductId::new(),
            color_name: "Red".to_string(),
            color_code: "#ff0000".to_string(),
            price_cents: Some(4999),
            stock: 3,
            image: None,
        };
        assert_eq!(v.effective_price_cents(2999), 4999);

        let v = Variant {
            price_cents: None,
            ..v
        };
        assert_eq!(v.effective_price_cents(2999), 2999);
    }

    #[test]
    fn total_stock_sums_variants() {
        let pid = ProductId::new();
        let product = Product {
            id: pid,
            name: "Blue Shoes".to_string(),
            price_cents: 5999,
            category: "shoes".to_string(),
            description: String::new(),
            image: None,
            disabled: false,
            discount_percent: None,
            original_price_cents: None,
            variants: vec![
                Variant {
                    id: VariantId::new(),
                    product_id: pid,
                    color_name: "Blue".to_string(),
                    color_code: "#0000ff".to_string(),
                    price_cents: None,
                    stock: 30,
                    image: None,
                },
                Variant {
                    id: VariantId::new(),
                    product_id: pid,
                    color_name: "Navy".to_string(),
                    color_code: "#000080".to_string(),
                    price_cents: None,
                    stock: 12,
                    image: None,
                },
            ],
        };
        assert_eq!(product.total_stock(), 42);
    }
}
