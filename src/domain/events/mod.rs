//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::order::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event")]
pub enum DomainEvent {
    Order(OrderEvent),
    Seller(SellerEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: String, customer_id: String, seller_ids: Vec<String>, total: Decimal },
    Shipped { order_id: String, tracking_number: String, courier: String },
    Delivered { order_id: String },
    Cancelled { order_id: String, previous: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SellerEvent {
    ApplicationSubmitted { application_id: String, user_id: String },
    ApplicationApproved { application_id: String, user_id: String },
    ApplicationRejected { application_id: String },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Order(e) => ("orders", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::Shipped { .. } => "shipped",
                OrderEvent::Delivered { .. } => "delivered",
                OrderEvent::Cancelled { .. } => "cancelled",
            }),
            Self::Seller(e) => ("sellers", match e {
                SellerEvent::ApplicationSubmitted { .. } => "submitted",
                SellerEvent::ApplicationApproved { .. } => "approved",
                SellerEvent::ApplicationRejected { .. } => "rejected",
            }),
        };
        format!("tataknorte.{aggregate}.{name}")
    }
}
