//! Service configuration read from the environment (`.env` is loaded by the binary).

use rust_decimal::Decimal;
use std::str::FromStr;
use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_SHIPPING_FEE: i64 = 120;
pub const DEFAULT_COURIER: &str = "J&T Express";

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    /// Postgres document store; in-memory stores are used when unset.
    pub database_url: Option<String>,
    /// Event bus; events are dropped when unset.
    pub nats_url: Option<String>,
    pub currency: String,
    /// Flat fee charged for `Standard` delivery.
    pub shipping_fee: Decimal,
    pub courier: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT, database_url: None, nats_url: None, currency: DEFAULT_CURRENCY.to_string(),
            shipping_fee: Decimal::new(DEFAULT_SHIPPING_FEE, 0), courier: DEFAULT_COURIER.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key: "PORT", value: v })?,
            None => defaults.port,
        };
        let shipping_fee = match get("SHIPPING_FEE") {
            Some(v) => Decimal::from_str(&v).ok().filter(|d| !d.is_sign_negative()).ok_or(ConfigError::Invalid { key: "SHIPPING_FEE", value: v })?,
            None => defaults.shipping_fee,
        };
        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            currency: get("CURRENCY").map(|c| c.to_uppercase()).unwrap_or(defaults.currency),
            shipping_fee,
            courier: get("COURIER_NAME").unwrap_or(defaults.courier),
        })
    }

    pub fn shipping_fee(&self) -> Money { Money::new(self.shipping_fee, &self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
