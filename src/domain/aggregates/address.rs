//! Address book

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::validate_mobile_number;

/// Zip code written when the buyer leaves it blank.
pub const DEFAULT_ZIP_CODE: &str = "0000";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Option<String>,
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(custom = "validate_mobile_number")]
    pub mobile_number: String,
    #[validate(length(min = 1, message = "street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "barangay is required"))]
    pub barangay: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "province is required"))]
    pub province: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
}

impl Address {
    /// One-line rendering used on order slips.
    pub fn single_line(&self) -> String {
        format!("{}, {}, {}, {} {}", self.street, self.barangay, self.city, self.province, self.zip_code)
    }
}

/// A user's saved addresses, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressBook { addresses: Vec<Address> }

impl AddressBook {
    pub fn new(addresses: Vec<Address>) -> Self { Self { addresses } }
    pub fn addresses(&self) -> &[Address] { &self.addresses }
    pub fn is_empty(&self) -> bool { self.addresses.is_empty() }
    pub fn len(&self) -> usize { self.addresses.len() }
    pub fn get(&self, index: usize) -> Option<&Address> { self.addresses.get(index) }

    /// First address flagged default, else the first saved one.
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.is_default).or_else(|| self.addresses.first())
    }

    /// Validates and appends. Duplicates are kept; the book is never deduplicated.
    pub fn append(&mut self, mut address: Address) -> Result<&Address, AddressError> {
        address.validate().map_err(|e| AddressError::Invalid(e.to_string()))?;
        if address.zip_code.trim().is_empty() { address.zip_code = DEFAULT_ZIP_CODE.to_string(); }
        if address.id.is_none() { address.id = Some(Uuid::now_v7().to_string()); }
        self.addresses.push(address);
        Ok(&self.addresses[self.addresses.len() - 1])
    }

    pub fn into_inner(self) -> Vec<Address> { self.addresses }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid address: {0}")]
    Invalid(String),
}
