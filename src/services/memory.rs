//! In-memory adapters, used when no database is configured and by the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{EventPublisher, OrderStore, ProfileStore, SellerApplicationStore};
use crate::domain::aggregates::{
    ApplicationStatus, CartLine, NewOrder, Order, OrderStatus, Profile, ProfilePatch, Role, SellerApplication,
};
use crate::domain::events::DomainEvent;
use crate::{CommerceError, Result};

#[derive(Debug, Default)]
pub struct InMemoryProfiles { profiles: RwLock<HashMap<String, Profile>> }

impl InMemoryProfiles {
    pub fn new() -> Self { Self::default() }

    pub async fn insert(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.uid.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.read().await.get(uid).cloned())
    }

    async fn save_bag(&self, uid: &str, lines: &[CartLine]) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(uid).ok_or_else(|| CommerceError::not_found("profile", uid))?;
        profile.bag = lines.to_vec();
        Ok(())
    }

    async fn save_profile_fields(&self, uid: &str, patch: ProfilePatch) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(uid).ok_or_else(|| CommerceError::not_found("profile", uid))?;
        profile.apply(patch);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrders { orders: RwLock<Vec<Order>> }

impl InMemoryOrders {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn create_order(&self, new: NewOrder) -> Result<Order> {
        let order = Order::place(new)?;
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self, role: Role, uid: &str) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut visible: Vec<Order> = orders.iter().filter(|o| match role {
            Role::Customer => o.customer_id() == uid,
            Role::Seller => o.involves_seller(uid),
            Role::Admin => true,
        }).cloned().collect();
        visible.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(visible)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.read().await.iter().find(|o| o.id() == order_id).cloned())
    }

    async fn set_order_status(&self, order_id: &str, from: OrderStatus, to: OrderStatus) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|o| o.id() == order_id).ok_or_else(|| CommerceError::not_found("order", order_id))?;
        if order.status() != from { return Err(CommerceError::InvalidTransition { from: order.status(), to }); }
        order.store_status(to);
        Ok(())
    }

    async fn set_tracking(&self, order_id: &str, number: &str, courier: &str) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|o| o.id() == order_id).ok_or_else(|| CommerceError::not_found("order", order_id))?;
        if order.status() != OrderStatus::Processing {
            return Err(CommerceError::InvalidTransition { from: order.status(), to: OrderStatus::Shipped });
        }
        order.store_tracking(number, courier);
        order.store_status(OrderStatus::Shipped);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySellerApplications { applications: RwLock<Vec<SellerApplication>> }

impl InMemorySellerApplications {
    pub fn new() -> Self { Self::default() }

    async fn decide(&self, id: &str, outcome: ApplicationStatus) -> bool {
        let mut applications = self.applications.write().await;
        match applications.iter_mut().find(|a| a.id() == id) {
            Some(app) if app.status == ApplicationStatus::Pending => { app.status = outcome; true }
            _ => false,
        }
    }
}

#[async_trait]
impl SellerApplicationStore for InMemorySellerApplications {
    async fn submit(&self, application: &SellerApplication) -> Result<()> {
        let mut stored = application.clone();
        stored.take_events();
        self.applications.write().await.push(stored);
        Ok(())
    }

    async fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<SellerApplication>> {
        let mut found: Vec<SellerApplication> = self.applications.read().await.iter().filter(|a| a.status == status).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn get(&self, id: &str) -> Result<Option<SellerApplication>> {
        Ok(self.applications.read().await.iter().find(|a| a.id() == id).cloned())
    }

    async fn approve(&self, application: &SellerApplication) -> Result<bool> {
        Ok(self.decide(application.id(), ApplicationStatus::Approved).await)
    }

    async fn reject(&self, id: &str) -> Result<bool> {
        Ok(self.decide(id, ApplicationStatus::Rejected).await)
    }
}

/// Keeps every published event; lets tests assert on what went out.
#[derive(Debug, Default)]
pub struct RecordingPublisher { events: RwLock<Vec<DomainEvent>> }

impl RecordingPublisher {
    pub fn new() -> Self { Self::default() }
    pub async fn events(&self) -> Vec<DomainEvent> { self.events.read().await.clone() }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
