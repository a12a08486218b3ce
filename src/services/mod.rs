//! External collaborators of the order pipeline.
//!
//! Each store is an opaque remote service; the pipeline only relies on
//! per-document atomic overwrite. Adapters live in the submodules.

pub mod carrier;
pub mod location;
pub mod memory;
pub mod nats;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{
    ApplicationStatus, CartLine, NewOrder, Order, OrderStatus, Profile, ProfilePatch, Role, SellerApplication,
};
use crate::domain::events::DomainEvent;
use crate::Result;

pub use carrier::SimulatedCarrier;
pub use location::StaticLocations;
pub use memory::{InMemoryOrders, InMemoryProfiles, InMemorySellerApplications, RecordingPublisher};
pub use nats::{NatsPublisher, NoopPublisher};
pub use postgres::PgStore;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>>;
    async fn save_bag(&self, uid: &str, lines: &[CartLine]) -> Result<()>;
    async fn save_profile_fields(&self, uid: &str, patch: ProfilePatch) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, new: NewOrder) -> Result<Order>;
    /// Customers see their own orders, sellers the orders they sell into, admins all; newest first.
    async fn list_orders(&self, role: Role, uid: &str) -> Result<Vec<Order>>;
    async fn get_order(&self, order_id: &str) -> Result<Option<Order>>;
    /// Moves the order from `from` to `to`, failing with `InvalidTransition` if the stored status is no longer `from`.
    async fn set_order_status(&self, order_id: &str, from: OrderStatus, to: OrderStatus) -> Result<()>;
    /// Records tracking data and moves a `Processing` order to `Shipped` in one write.
    async fn set_tracking(&self, order_id: &str, number: &str, courier: &str) -> Result<()>;
}

/// A `(code, display name)` pair from the location directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCode { pub code: String, pub name: String }

/// Province → city → barangay lookups. Unknown parent codes yield empty lists, not errors.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn list_provinces(&self) -> Result<Vec<LocationCode>>;
    async fn list_cities(&self, province_code: &str) -> Result<Vec<LocationCode>>;
    async fn list_barangays(&self, city_code: &str) -> Result<Vec<LocationCode>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent { pub timestamp: String, pub status: String, pub location: String, pub description: String }

/// Read-only carrier feed; events come back most recent first.
#[async_trait]
pub trait CarrierTracking: Send + Sync {
    async fn get_events(&self, tracking_number: &str, current_status: OrderStatus) -> Result<Vec<TrackingEvent>>;
}

#[async_trait]
pub trait SellerApplicationStore: Send + Sync {
    async fn submit(&self, application: &SellerApplication) -> Result<()>;
    async fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<SellerApplication>>;
    async fn get(&self, id: &str) -> Result<Option<SellerApplication>>;
    /// Records the approval; `false` when the application is missing or no longer pending.
    async fn approve(&self, application: &SellerApplication) -> Result<bool>;
    async fn reject(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<()>;
}

/// Publishes drained aggregate events. Failures are logged; the state change they describe already happened.
pub async fn publish_all(publisher: &dyn EventPublisher, events: Vec<DomainEvent>) {
    for event in events {
        if let Err(e) = publisher.publish(&event).await {
            tracing::warn!(subject = %event.subject(), error = %e, "Failed to publish domain event");
        }
    }
}
