//! Order Aggregate
//!
//! An order is a frozen copy of the cart taken at checkout. After creation
//! only the status and the tracking fields change:
//!
//! ```text
//! Processing ──ship──▶ Shipped ──deliver──▶ Delivered
//!     │
//!     └──cancel──▶ Cancelled
//! ```
//!
//! There is one status per order even when several sellers share it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::{address::Address, cart::CartLine};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    customer_id: String,
    customer_name: String,
    items: Vec<CartLine>,
    total_amount: Money,
    status: OrderStatus,
    payment_method: PaymentMethod,
    delivery_method: DeliveryMethod,
    shipping_address: Option<Address>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    seller_ids: Vec<String>,
    tracking_number: Option<String>,
    courier: Option<String>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Everything the order store needs to create an order.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub buyer_id: String,
    pub buyer_name: String,
    pub lines: Vec<CartLine>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub address: Option<Address>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "GCash")] GCash,
    PayMaya,
    #[default]
    #[serde(rename = "COD")] Cod,
    BankTransfer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryMethod { #[default] Standard, Pickup }

/// The slice of an order one seller fulfils.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerOrderView {
    pub order_id: String,
    pub status: OrderStatus,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Processing => "Processing", Self::Shipped => "Shipped", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled" }
    }
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!((self, next), (Self::Processing, Self::Shipped) | (Self::Processing, Self::Cancelled) | (Self::Shipped, Self::Delivered))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() { return Err(OrderError::NoItems); }
        if self.delivery_method == DeliveryMethod::Standard && self.address.is_none() { return Err(OrderError::MissingAddress); }
        Ok(())
    }
}

impl Order {
    /// Builds a `Processing` order from a checkout submission.
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        new.validate()?;
        let mut seller_ids: Vec<String> = Vec::new();
        for seller in new.lines.iter().filter_map(CartLine::seller_id) {
            if !seller_ids.iter().any(|s| s == seller) { seller_ids.push(seller.to_string()); }
        }
        let shipping_address = match new.delivery_method { DeliveryMethod::Standard => new.address, DeliveryMethod::Pickup => None };
        Ok(Self {
            id: Uuid::now_v7().to_string(), customer_id: new.buyer_id, customer_name: new.buyer_name, items: new.lines,
            total_amount: new.total, status: OrderStatus::Processing, payment_method: new.payment_method,
            delivery_method: new.delivery_method, shipping_address, created_at: Utc::now(), seller_ids,
            tracking_number: None, courier: None, events: vec![],
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn customer_id(&self) -> &str { &self.customer_id }
    pub fn customer_name(&self) -> &str { &self.customer_name }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn delivery_method(&self) -> DeliveryMethod { self.delivery_method }
    pub fn shipping_address(&self) -> Option<&Address> { self.shipping_address.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn seller_ids(&self) -> &[String] { &self.seller_ids }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn courier(&self) -> Option<&str> { self.courier.as_deref() }
    pub fn involves_seller(&self, seller_id: &str) -> bool { self.seller_ids.iter().any(|s| s == seller_id) }

    /// `Processing → Shipped`; the only transition that writes tracking data.
    pub fn ship(&mut self, tracking_number: impl Into<String>, courier: impl Into<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Shipped)?;
        let (tracking_number, courier) = (tracking_number.into(), courier.into());
        self.tracking_number = Some(tracking_number.clone());
        self.courier = Some(courier.clone());
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id.clone(), tracking_number, courier }));
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Delivered)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id.clone() }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        let previous = self.status;
        self.transition(OrderStatus::Cancelled)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id.clone(), previous }));
        Ok(())
    }

    /// Lines sold by `seller_id` and their subtotal.
    pub fn seller_view(&self, seller_id: &str) -> SellerOrderView {
        let lines: Vec<CartLine> = self.items.iter().filter(|l| l.seller_id() == Some(seller_id)).cloned().collect();
        let subtotal = lines.iter().fold(Money::zero(self.total_amount.currency()), |acc, l| acc.add(&l.line_total()).unwrap_or(acc));
        SellerOrderView { order_id: self.id.clone(), status: self.status, lines, subtotal, created_at: self.created_at }
    }

    /// Raw field writes used by stores replaying `setOrderStatus` / `setTracking`.
    pub(crate) fn store_status(&mut self, status: OrderStatus) { self.status = status; }
    pub(crate) fn store_tracking(&mut self, number: &str, courier: &str) {
        self.tracking_number = Some(number.to_string());
        self.courier = Some(courier.to_string());
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) { return Err(OrderError::InvalidTransition { from: self.status, to: next }); }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Standard delivery requires a shipping address")]
    MissingAddress,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
