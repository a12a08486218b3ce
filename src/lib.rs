//! Tatak Norte Order Pipeline
//!
//! Cart, checkout and order lifecycle for a regional artisan marketplace.
//! Persistence, identity, location data and carrier tracking are external
//! collaborators reached through the traits in [`services`].
//!
//! ## Features
//! - Cart aggregation keyed by product and variation, mirrored to the buyer profile
//! - Checkout with address selection over a province → city → barangay cascade
//! - Order lifecycle (Processing → Shipped → Delivered, or Cancelled) with carrier tracking
//! - Seller onboarding applications reviewed by admins

pub mod application;
pub mod config;
pub mod domain;
pub mod http;
pub mod services;

use thiserror::Error;
use crate::domain::aggregates::{AddressError, ApplicationError, CartError, OrderError, OrderStatus};

pub use crate::config::Settings;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Please select a delivery address")]
    MissingAddress,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Remote call failed: {0}")]
    Remote(String),
}

impl CommerceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self { Self::NotFound { kind, id: id.into() } }
}

impl From<CartError> for CommerceError {
    fn from(e: CartError) -> Self { Self::Validation(e.to_string()) }
}

impl From<AddressError> for CommerceError {
    fn from(e: AddressError) -> Self { Self::Validation(e.to_string()) }
}

impl From<ApplicationError> for CommerceError {
    fn from(e: ApplicationError) -> Self { Self::Validation(e.to_string()) }
}

impl From<OrderError> for CommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::EmptyCart,
            OrderError::MissingAddress => Self::MissingAddress,
            OrderError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
        }
    }
}

impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self { Self::Remote(e.to_string()) }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self { Self::Remote(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
