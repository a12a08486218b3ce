//! Product snapshot
//!
//! Products belong to the catalog; the order pipeline only reads them, so the
//! type is a plain serde document rather than an aggregate with invariants.

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub artisan: String,
    pub seller_id: Option<String>,
    pub stock: Option<u32>,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation { pub id: String, pub name: String, #[serde(default)] pub image: String, pub price: Money, pub stock: Option<u32> }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category { #[default] Weaving, Pottery, Delicacy, Accessory }

/// What a listing shows before a variation is chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayPrice {
    Single(Money),
    Range { min: Money, max: Money },
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money, seller_id: Option<String>) -> Self {
        Self {
            id: id.into(), name: name.into(), price, description: String::new(), category: Category::default(),
            image: String::new(), rating: 0.0, reviews: 0, artisan: String::new(), seller_id, stock: None, variations: vec![],
        }
    }

    pub fn with_variation(mut self, variation: Variation) -> Self { self.variations.push(variation); self }

    pub fn has_variations(&self) -> bool { !self.variations.is_empty() }

    pub fn variation(&self, id: &str) -> Option<&Variation> { self.variations.iter().find(|v| v.id == id) }

    /// Base price, or the `[min, max]` span of the variation prices.
    pub fn display_price(&self) -> DisplayPrice {
        let mut prices = self.variations.iter().map(|v| &v.price);
        let Some(first) = prices.next() else { return DisplayPrice::Single(self.price.clone()) };
        let (min, max) = prices.fold((first, first), |(lo, hi), p| {
            (if p.amount() < lo.amount() { p } else { lo }, if p.amount() > hi.amount() { p } else { hi })
        });
        if min.amount() == max.amount() { DisplayPrice::Single(min.clone()) } else { DisplayPrice::Range { min: min.clone(), max: max.clone() } }
    }

    /// Price charged for one unit with the given variation selected.
    pub fn unit_price(&self, variation: Option<&Variation>) -> Money {
        variation.map_or_else(|| self.price.clone(), |v| v.price.clone())
    }
}

impl Variation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self { id: id.into(), name: name.into(), image: String::new(), price, stock: None }
    }
}
