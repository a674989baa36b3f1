//! Order draft: the cart submission the Order Writer consumes.

use serde::{Deserialize, Serialize};

use savx_core::{ProductId, VariantId};

use crate::error::PlaceOrderError;
use crate::order::{CustomerInfo, ShippingInfo};

/// One submitted line. The variant selection is optional at the wire level
/// so that its absence can be rejected with a precise error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub product_name: String,
    pub color_name: String,
}

/// Cart submission: everything needed to atomically produce an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer: CustomerInfo,
    pub shipping: ShippingInfo,
    pub lines: Vec<DraftLine>,
    /// Caller-supplied order number; generated server-side when absent.
    pub order_number: Option<String>,
}

/// A draft that passed pure validation: every line carries a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub product_name: String,
    pub color_name: String,
}

impl OrderDraft {
    /// Pure validation phase: rejects empty drafts, missing variant
    /// selections and non-positive quantities before anything touches
    /// storage. Returns the lines with variant selections made mandatory.
    pub fn validate(&self) -> Result<Vec<ValidatedLine>, PlaceOrderError> {
        if self.lines.is_empty() {
            return Err(PlaceOrderError::EmptyOrder);
        }

        let mut validated = Vec::with_capacity(self.lines.len());
        for (idx, line) in self.lines.iter().enumerate() {
            let variant_id = line
                .variant_id
                .ok_or(PlaceOrderError::MissingVariant { line: idx })?;
            if line.quantity <= 0 {
                return Err(PlaceOrderError::InvalidQuantity { line: idx });
            }
            if line.unit_price_cents < 0 {
                return Err(PlaceOrderError::InvalidPrice { line: idx });
            }
            validated.push(ValidatedLine {
                product_id: line.product_id,
                variant_id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                product_name: line.product_name.clone(),
                color_name: line.color_name.clone(),
            });
        }
        Ok(validated)
    }

    /// Order total: sum of quantity times unit price over all lines.
    /// Saturates rather than overflowing on absurd caller input.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().fold(0i64, |total, l| {
            total.saturating_add(l.quantity.saturating_mul(l.unit_price_cents))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

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

    fn draft_line(qty: i64) -> DraftLine {
        DraftLine {
            product_id: ProductId::new(),
            variant_id: Some(VariantId::new()),
            quantity: qty,
            unit_price_cents: 2999,
            product_name: "Modern Black Watch".to_string(),
            color_name: "Black".to_string(),
        }
    }

    #[test]
    fn empty_draft_is_rejected() {
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![],
            order_number: None,
        };
        assert_eq!(draft.validate().unwrap_err(), PlaceOrderError::EmptyOrder);
    }

    #[test]
    fn missing_variant_is_rejected_with_line_index() {
        let mut second = draft_line(1);
        second.variant_id = None;
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![draft_line(1), second],
            order_number: None,
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            PlaceOrderError::MissingVariant { line: 1 }
        );
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![draft_line(0)],
            order_number: None,
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            PlaceOrderError::InvalidQuantity { line: 0 }
        );
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let mut bad = draft_line(1);
        bad.unit_price_cents = -1;
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![bad],
            order_number: None,
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            PlaceOrderError::InvalidPrice { line: 0 }
        );
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let mut huge = draft_line(2);
        huge.unit_price_cents = i64::MAX;
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![huge, draft_line(1)],
            order_number: None,
        };
        assert_eq!(draft.total_cents(), i64::MAX);
    }

    #[test]
    fn valid_draft_returns_lines_with_variants() {
        let draft = OrderDraft {
            customer: customer(),
            shipping: shipping(),
            lines: vec![draft_line(2), draft_line(1)],
            order_number: None,
        };
        let validated = draft.validate().unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].quantity, 2);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_line_totals(
            quantities in proptest::collection::vec(1i64..100, 1..8),
            price in 1i64..100_000,
        ) {
            let lines: Vec<DraftLine> = quantities
                .iter()
                .map(|&q| DraftLine { quantity: q, unit_price_cents: price, ..draft_line(1) })
                .collect();
            let expected: i64 = quantities.iter().map(|q| q * price).sum();
            let draft = OrderDraft {
                customer: customer(),
                shipping: shipping(),
                lines,
                order_number: None,
            };
            prop_assert_eq!(draft.total_cents(), expected);
        }
    }
}
