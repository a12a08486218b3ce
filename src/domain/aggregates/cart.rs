//! Cart Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::{Product, Variation};
use crate::domain::value_objects::{LineKey, Money, DEFAULT_CURRENCY};

#[derive(Clone, Debug)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: String,
}

/// A product snapshot with the quantity and variation the buyer picked.
///
/// Serialised flat, the way the profile `bag` stores it: product fields plus
/// `quantity` and `selectedVariation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
    pub selected_variation: Option<Variation>,
}

impl CartLine {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product.id.clone(), self.selected_variation.as_ref().map(|v| v.id.clone()))
    }
    pub fn unit_price(&self) -> Money { self.product.unit_price(self.selected_variation.as_ref()) }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity) }
    pub fn seller_id(&self) -> Option<&str> { self.product.seller_id.as_deref() }
}

impl Cart {
    pub fn new(currency: &str) -> Self { Self { lines: vec![], currency: currency.to_string() } }

    /// Rebuilds a cart from persisted lines, merging any duplicated keys.
    pub fn from_lines(lines: Vec<CartLine>, currency: &str) -> Self {
        let mut cart = Self::new(currency);
        for line in lines { cart.merge(line); }
        cart
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn len(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> u32 { self.lines.iter().map(|l| l.quantity).sum() }
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> { self.lines.iter().find(|l| &l.key() == key) }

    /// Adds `quantity` units (zero counts as one), merging into an existing line with the same key.
    pub fn add(&mut self, product: Product, variation: Option<Variation>, quantity: u32) -> Result<&[CartLine], CartError> {
        match &variation {
            None if product.has_variations() => return Err(CartError::VariationRequired(product.id)),
            Some(v) if product.variation(&v.id).is_none() => {
                return Err(CartError::UnknownVariation { product_id: product.id, variation_id: v.id.clone() });
            }
            _ => {}
        }
        let price = product.unit_price(variation.as_ref());
        if price.currency() != self.currency {
            return Err(CartError::CurrencyMismatch { product_id: product.id, expected: self.currency.clone(), found: price.currency().to_string() });
        }
        self.merge(CartLine { product, quantity: quantity.max(1), selected_variation: variation });
        Ok(&self.lines)
    }

    /// Applies `delta` to the line's quantity, never going below one. Returns whether a line matched.
    pub fn update_quantity(&mut self, key: &LineKey, delta: i32) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| &l.key() == key) else { return false };
        let next = (i64::from(line.quantity) + i64::from(delta)).clamp(1, i64::from(u32::MAX));
        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        true
    }

    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key() != key);
        self.lines.len() != before
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    /// Sum of `unit price × quantity` over every line. Fails if a line is priced in another currency.
    pub fn total(&self) -> Result<Money, CartError> {
        self.lines.iter().try_fold(Money::zero(&self.currency), |acc, l| {
            acc.add(&l.line_total()).map_err(|_| CartError::CurrencyMismatch {
                product_id: l.product.id.clone(),
                expected: self.currency.clone(),
                found: l.unit_price().currency().to_string(),
            })
        })
    }

    fn merge(&mut self, line: CartLine) {
        let key = line.key();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key() == key) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            self.lines.push(line);
        }
    }
}

impl Default for Cart { fn default() -> Self { Self::new(DEFAULT_CURRENCY) } }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Product {0} requires a variation to be selected")]
    VariationRequired(String),
    #[error("Product {product_id} has no variation {variation_id}")]
    UnknownVariation { product_id: String, variation_id: String },
    #[error("Product {product_id} is priced in {found}, the cart settles in {expected}")]
    CurrencyMismatch { product_id: String, expected: String, found: String },
}
