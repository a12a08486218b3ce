//! Order Lifecycle
//!
//! Status changes are checked on the loaded aggregate first, then written to
//! the store conditionally on the status that was loaded. Of two concurrent
//! transitions on one order only the first write lands; the other gets
//! `InvalidTransition` and publishes nothing. Shipping stores the tracking
//! data and the status in one write.

use std::sync::Arc;

use super::Actor;
use crate::domain::aggregates::{Order, OrderStatus, Role, SellerOrderView};
use crate::services::{publish_all, CarrierTracking, EventPublisher, OrderStore, TrackingEvent};
use crate::{CommerceError, Result};

pub struct OrderLifecycle {
    orders: Arc<dyn OrderStore>,
    carrier: Arc<dyn CarrierTracking>,
    publisher: Arc<dyn EventPublisher>,
    courier: String,
}

/// `JT` followed by ten digits.
fn issue_tracking_number() -> String {
    format!("JT{:010}", rand::random::<u64>() % 10_000_000_000)
}

fn can_view(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Customer => order.customer_id() == actor.uid,
        Role::Seller => order.involves_seller(&actor.uid) || order.customer_id() == actor.uid,
        Role::Admin => true,
    }
}

fn can_fulfil(actor: &Actor, order: &Order) -> bool {
    match actor.role {
        Role::Customer => false,
        Role::Seller => order.involves_seller(&actor.uid),
        Role::Admin => true,
    }
}

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderStore>, carrier: Arc<dyn CarrierTracking>, publisher: Arc<dyn EventPublisher>, courier: impl Into<String>) -> Self {
        Self { orders, carrier, publisher, courier: courier.into() }
    }

    /// Buyer history for customers, incoming orders for sellers, everything for admins.
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Order>> {
        self.orders.list_orders(actor.role, &actor.uid).await
    }

    /// Orders the actor placed, whatever their role.
    pub async fn history(&self, actor: &Actor) -> Result<Vec<Order>> {
        self.orders.list_orders(Role::Customer, &actor.uid).await
    }

    /// The seller's fulfilment queue, each order cut down to that seller's lines.
    pub async fn seller_queue(&self, actor: &Actor) -> Result<Vec<SellerOrderView>> {
        match actor.role {
            Role::Seller => {}
            Role::Customer | Role::Admin => return Err(CommerceError::Forbidden(format!("{} has no seller queue", actor.uid))),
        }
        let orders = self.orders.list_orders(Role::Seller, &actor.uid).await?;
        Ok(orders.iter().map(|o| o.seller_view(&actor.uid)).collect())
    }

    pub async fn get(&self, actor: &Actor, order_id: &str) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !can_view(actor, &order) {
            return Err(CommerceError::Forbidden(format!("{} cannot view order {order_id}", actor.uid)));
        }
        Ok(order)
    }

    /// `Processing → Shipped`, issuing a tracking number with the configured courier.
    pub async fn mark_shipped(&self, actor: &Actor, order_id: &str) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        self.authorize_fulfilment(actor, &order)?;
        let tracking_number = issue_tracking_number();
        order.ship(tracking_number.clone(), self.courier.clone())?;

        self.orders.set_tracking(order_id, &tracking_number, &self.courier).await?;
        tracing::info!(order_id, tracking_number = %tracking_number, courier = %self.courier, by = %actor.uid, "Order shipped");
        publish_all(self.publisher.as_ref(), order.take_events()).await;
        Ok(order)
    }

    pub async fn mark_delivered(&self, actor: &Actor, order_id: &str) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        self.authorize_fulfilment(actor, &order)?;
        let from = order.status();
        order.deliver()?;
        self.orders.set_order_status(order_id, from, OrderStatus::Delivered).await?;
        tracing::info!(order_id, by = %actor.uid, "Order delivered");
        publish_all(self.publisher.as_ref(), order.take_events()).await;
        Ok(order)
    }

    /// Only `Processing` orders can be cancelled, by the buyer or anyone who may fulfil them.
    pub async fn cancel(&self, actor: &Actor, order_id: &str) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        if order.customer_id() != actor.uid && !can_fulfil(actor, &order) {
            return Err(CommerceError::Forbidden(format!("{} cannot cancel order {order_id}", actor.uid)));
        }
        let from = order.status();
        order.cancel()?;
        self.orders.set_order_status(order_id, from, OrderStatus::Cancelled).await?;
        tracing::info!(order_id, by = %actor.uid, "Order cancelled");
        publish_all(self.publisher.as_ref(), order.take_events()).await;
        Ok(order)
    }

    /// Carrier events, most recent first. `None` when the order has no tracking
    /// number yet; the carrier is not called in that case.
    pub async fn tracking(&self, actor: &Actor, order_id: &str) -> Result<Option<Vec<TrackingEvent>>> {
        let order = self.get(actor, order_id).await?;
        let Some(number) = order.tracking_number() else { return Ok(None) };
        let events = self.carrier.get_events(number, order.status()).await.map_err(|e| {
            tracing::warn!(order_id, tracking_number = number, error = %e, "Carrier lookup failed");
            e
        })?;
        Ok(Some(events))
    }

    async fn load(&self, order_id: &str) -> Result<Order> {
        self.orders.get_order(order_id).await?.ok_or_else(|| CommerceError::not_found("order", order_id))
    }

    fn authorize_fulfilment(&self, actor: &Actor, order: &Order) -> Result<()> {
        if can_fulfil(actor, order) { Ok(()) } else { Err(CommerceError::Forbidden(format!("{} cannot fulfil order {}", actor.uid, order.id()))) }
    }
}

impl std::fmt::Debug for OrderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLifecycle").field("courier", &self.courier).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::domain::aggregates::order::tests::{line, new_order};
    use crate::domain::aggregates::{DeliveryMethod, NewOrder};
    use crate::services::{InMemoryOrders, RecordingPublisher, SimulatedCarrier};

    struct CountingCarrier { calls: AtomicUsize }

    #[async_trait]
    impl CarrierTracking for CountingCarrier {
        async fn get_events(&self, tracking_number: &str, current_status: OrderStatus) -> Result<Vec<TrackingEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SimulatedCarrier::new().get_events(tracking_number, current_status).await
        }
    }

    struct Fixture {
        lifecycle: OrderLifecycle,
        orders: Arc<InMemoryOrders>,
        carrier: Arc<CountingCarrier>,
        publisher: Arc<RecordingPublisher>,
    }

    async fn fixture() -> (Fixture, String) {
        let orders = Arc::new(InMemoryOrders::new());
        let carrier = Arc::new(CountingCarrier { calls: AtomicUsize::new(0) });
        let publisher = Arc::new(RecordingPublisher::new());
        let order = orders.create_order(new_order(vec![line("A", "S1", 500, 2), line("B", "S2", 300, 1)], DeliveryMethod::Standard)).await.unwrap();
        let lifecycle = OrderLifecycle::new(orders.clone(), carrier.clone(), publisher.clone(), "J&T Express");
        (Fixture { lifecycle, orders, carrier, publisher }, order.id().to_string())
    }

    fn seller(uid: &str) -> Actor { Actor::new(uid, Role::Seller) }

    /// Hands control back to the runtime after every read so two transitions interleave.
    struct InterleavedOrders { inner: Arc<InMemoryOrders> }

    #[async_trait]
    impl OrderStore for InterleavedOrders {
        async fn create_order(&self, new: NewOrder) -> Result<Order> { self.inner.create_order(new).await }
        async fn list_orders(&self, role: Role, uid: &str) -> Result<Vec<Order>> { self.inner.list_orders(role, uid).await }
        async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
            let order = self.inner.get_order(order_id).await;
            tokio::task::yield_now().await;
            order
        }
        async fn set_order_status(&self, order_id: &str, from: OrderStatus, to: OrderStatus) -> Result<()> {
            self.inner.set_order_status(order_id, from, to).await
        }
        async fn set_tracking(&self, order_id: &str, number: &str, courier: &str) -> Result<()> {
            self.inner.set_tracking(order_id, number, courier).await
        }
    }

    #[tokio::test]
    async fn test_ship_assigns_tracking() {
        let (f, id) = fixture().await;
        let shipped = f.lifecycle.mark_shipped(&seller("S1"), &id).await.unwrap();
        let number = shipped.tracking_number().unwrap();
        assert!(number.starts_with("JT"));
        assert_eq!(number.len(), 12);
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));

        let stored = f.orders.get_order(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Shipped);
        assert_eq!(stored.tracking_number(), Some(number));
        assert_eq!(stored.courier(), Some("J&T Express"));
        assert_eq!(f.publisher.events().await[0].subject(), "tataknorte.orders.shipped");
    }

    #[tokio::test]
    async fn test_ship_requires_owning_seller_or_admin() {
        let (f, id) = fixture().await;
        assert!(matches!(f.lifecycle.mark_shipped(&seller("S3"), &id).await, Err(CommerceError::Forbidden(_))));
        assert!(matches!(f.lifecycle.mark_shipped(&Actor::new("buyer", Role::Customer), &id).await, Err(CommerceError::Forbidden(_))));
        assert_eq!(f.orders.get_order(&id).await.unwrap().unwrap().status(), OrderStatus::Processing);
        f.lifecycle.mark_shipped(&Actor::new("root", Role::Admin), &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_ship_keeps_first_tracking_number() {
        let (f, id) = fixture().await;
        let first = f.lifecycle.mark_shipped(&seller("S1"), &id).await.unwrap();
        let err = f.lifecycle.mark_shipped(&seller("S2"), &id).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { from: OrderStatus::Shipped, to: OrderStatus::Shipped }));
        assert_eq!(f.orders.get_order(&id).await.unwrap().unwrap().tracking_number(), first.tracking_number());
    }

    #[tokio::test]
    async fn test_terminal_orders_stay_put() {
        let (f, id) = fixture().await;
        f.lifecycle.cancel(&Actor::new("buyer", Role::Customer), &id).await.unwrap();
        assert!(matches!(f.lifecycle.mark_shipped(&seller("S1"), &id).await, Err(CommerceError::InvalidTransition { .. })));
        assert!(matches!(f.lifecycle.mark_delivered(&seller("S1"), &id).await, Err(CommerceError::InvalidTransition { .. })));
        let stored = f.orders.get_order(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Cancelled);
        assert!(stored.tracking_number().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_ship_and_cancel_only_one_lands() {
        let (f, id) = fixture().await;
        let interleaved = Arc::new(InterleavedOrders { inner: f.orders.clone() });
        let lifecycle = OrderLifecycle::new(interleaved, f.carrier.clone(), f.publisher.clone(), "J&T Express");

        let seller_actor = seller("S1");
        let buyer_actor = Actor::new("buyer", Role::Customer);
        let (shipped, cancelled) = tokio::join!(
            lifecycle.mark_shipped(&seller_actor, &id),
            lifecycle.cancel(&buyer_actor, &id),
        );
        assert!(shipped.is_ok() != cancelled.is_ok());
        let loser = if shipped.is_ok() { cancelled.unwrap_err() } else { shipped.unwrap_err() };
        assert!(matches!(loser, CommerceError::InvalidTransition { from: OrderStatus::Shipped | OrderStatus::Cancelled, .. }));

        let stored = f.orders.get_order(&id).await.unwrap().unwrap();
        match stored.status() {
            OrderStatus::Shipped => assert!(stored.tracking_number().is_some()),
            OrderStatus::Cancelled => assert!(stored.tracking_number().is_none()),
            other => panic!("unexpected status {other}"),
        }
        assert_eq!(f.publisher.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delivered_cannot_be_cancelled() {
        let (f, id) = fixture().await;
        f.lifecycle.mark_shipped(&seller("S1"), &id).await.unwrap();
        assert!(f.lifecycle.cancel(&Actor::new("buyer", Role::Customer), &id).await.is_err());
        f.lifecycle.mark_delivered(&seller("S1"), &id).await.unwrap();
        assert!(f.lifecycle.cancel(&Actor::new("root", Role::Admin), &id).await.is_err());
        assert_eq!(f.orders.get_order(&id).await.unwrap().unwrap().status(), OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_strangers_cannot_cancel() {
        let (f, id) = fixture().await;
        assert!(matches!(f.lifecycle.cancel(&Actor::new("someone", Role::Customer), &id).await, Err(CommerceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_tracking_skipped_until_shipped() {
        let (f, id) = fixture().await;
        let buyer = Actor::new("buyer", Role::Customer);
        assert!(f.lifecycle.tracking(&buyer, &id).await.unwrap().is_none());
        assert_eq!(f.carrier.calls.load(Ordering::SeqCst), 0);

        f.lifecycle.mark_shipped(&seller("S1"), &id).await.unwrap();
        let events = f.lifecycle.tracking(&buyer, &id).await.unwrap().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, "In Transit");
        assert_eq!(f.carrier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_seller_queue_shows_own_lines() {
        let (f, _id) = fixture().await;
        let queue = f.lifecycle.seller_queue(&seller("S1")).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue[0].lines.iter().all(|l| l.seller_id() == Some("S1")));
        assert_eq!(queue[0].subtotal.amount(), Decimal::new(1000, 0));
        assert!(f.lifecycle.seller_queue(&Actor::new("buyer", Role::Customer)).await.is_err());
    }

    #[tokio::test]
    async fn test_visibility_and_missing_orders() {
        let (f, id) = fixture().await;
        assert!(f.lifecycle.get(&Actor::new("buyer", Role::Customer), &id).await.is_ok());
        assert!(matches!(f.lifecycle.get(&Actor::new("other", Role::Customer), &id).await, Err(CommerceError::Forbidden(_))));
        assert!(matches!(f.lifecycle.mark_shipped(&seller("S1"), "nope").await, Err(CommerceError::NotFound { .. })));
        assert_eq!(f.lifecycle.list_for(&seller("S2")).await.unwrap().len(), 1);
        assert_eq!(f.lifecycle.history(&seller("S2")).await.unwrap().len(), 0);
    }
}
