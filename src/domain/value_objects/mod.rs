//! Value Objects for the order pipeline

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationError;

/// Currency the marketplace settles in unless configured otherwise.
pub const DEFAULT_CURRENCY: &str = "PHP";

/// Digits required in a Philippine mobile number (`09XXXXXXXXX`).
pub const MOBILE_NUMBER_DIGITS: usize = 11;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn php(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() }); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.currency, self.amount) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Identity of a cart line: a product plus the variation chosen for it, if any.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: String,
    pub variation_id: Option<String>,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, variation_id: Option<String>) -> Self {
        Self { product_id: product_id.into(), variation_id }
    }
    pub fn product(product_id: impl Into<String>) -> Self { Self::new(product_id, None) }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variation_id {
            Some(v) => write!(f, "{}#{}", self.product_id, v),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Strips everything but ASCII digits, the way the phone inputs are normalised before validation.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `validator` hook for mobile number fields.
pub fn validate_mobile_number(value: &str) -> Result<(), ValidationError> {
    if value.len() == MOBILE_NUMBER_DIGITS && value.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("mobile_number");
    err.message = Some(format!("must be exactly {MOBILE_NUMBER_DIGITS} digits").into());
    Err(err)
}
