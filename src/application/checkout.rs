//! Checkout Orchestrator
//!
//! Quotes the cart, tracks delivery, payment and address choices, and turns
//! the cart into an order. The cart is cleared only after the order store has
//! accepted the order.

use serde::Serialize;

use super::address_flow::AddressFlow;
use super::session::Session;
use crate::domain::aggregates::{Address, AddressBook, Cart, DeliveryMethod, NewOrder, Order, PaymentMethod};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use crate::services::{publish_all, EventPublisher, OrderStore};
use crate::{CommerceError, Result, Settings};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub subtotal: Money,
    pub shipping: Money,
    pub grand_total: Money,
}

/// `grand_total = subtotal + shipping`, where shipping is the flat fee for `Standard` and zero for `Pickup`.
pub fn quote(cart: &Cart, delivery: DeliveryMethod, shipping_fee: &Money) -> Result<CheckoutQuote> {
    let subtotal = cart.total()?;
    let shipping = match delivery {
        DeliveryMethod::Standard => shipping_fee.clone(),
        DeliveryMethod::Pickup => Money::zero(subtotal.currency()),
    };
    let grand_total = subtotal.add(&shipping).map_err(|e| CommerceError::Validation(e.to_string()))?;
    Ok(CheckoutQuote { subtotal, shipping, grand_total })
}

#[derive(Clone, Debug)]
pub struct Checkout {
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    addresses: AddressFlow,
    shipping_fee: Money,
}

impl Checkout {
    pub fn open(book: &AddressBook, settings: &Settings) -> Self {
        Self {
            delivery_method: DeliveryMethod::default(),
            payment_method: PaymentMethod::default(),
            addresses: AddressFlow::new(book),
            shipping_fee: settings.shipping_fee(),
        }
    }

    pub fn addresses(&self) -> &AddressFlow { &self.addresses }
    pub fn addresses_mut(&mut self) -> &mut AddressFlow { &mut self.addresses }
    pub fn selected_address(&self) -> Option<&Address> { self.addresses.selected() }

    pub fn quote(&self, cart: &Cart) -> Result<CheckoutQuote> { quote(cart, self.delivery_method, &self.shipping_fee) }

    /// Places the order for the session's cart.
    ///
    /// Validation failures create nothing. A failed create leaves the cart as
    /// it was so the buyer can retry.
    pub async fn submit(&self, session: &mut Session, orders: &dyn OrderStore, publisher: &dyn EventPublisher) -> Result<Order> {
        let cart = session.cart().cart();
        if cart.is_empty() {
            tracing::info!(uid = session.uid(), "Checkout rejected: empty cart");
            return Err(CommerceError::EmptyCart);
        }
        let address = match self.delivery_method {
            DeliveryMethod::Standard => match self.addresses.selected() {
                Some(address) => Some(address.clone()),
                None => {
                    tracing::info!(uid = session.uid(), "Checkout rejected: no delivery address");
                    return Err(CommerceError::MissingAddress);
                }
            },
            DeliveryMethod::Pickup => None,
        };
        let quote = self.quote(cart)?;
        let new = NewOrder {
            buyer_id: session.uid().to_string(),
            buyer_name: session.display_name().to_string(),
            lines: cart.lines().to_vec(),
            total: quote.grand_total,
            payment_method: self.payment_method,
            delivery_method: self.delivery_method,
            address,
        };

        let order = match orders.create_order(new).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(uid = session.uid(), error = %e, "Failed to place order; cart kept");
                return Err(e);
            }
        };
        tracing::info!(order_id = %order.id(), uid = session.uid(), total = %order.total_amount(), "Order placed");

        session.cart_mut().clear().await;
        let placed = OrderEvent::Placed {
            order_id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            seller_ids: order.seller_ids().to_vec(),
            total: order.total_amount().amount(),
        };
        publish_all(publisher, vec![DomainEvent::Order(placed)]).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use crate::domain::aggregates::address::tests::sample;
    use crate::domain::aggregates::order::tests::line;
    use crate::domain::aggregates::{CartLine, OrderStatus, Product, Profile, Role};
    use crate::services::{InMemoryOrders, InMemoryProfiles, ProfileStore, RecordingPublisher};

    fn php(amount: i64) -> Money { Money::php(Decimal::new(amount, 0)) }

    fn lines() -> Vec<CartLine> { vec![line("A", "S1", 500, 2), line("B", "S2", 300, 1)] }

    fn guest_with_cart() -> Session {
        Session::resume_guest("guest_1".into(), Cart::from_lines(lines(), "PHP"), AddressBook::default(), Arc::new(InMemoryProfiles::new()))
    }

    async fn member_with_cart() -> (Session, Arc<InMemoryProfiles>) {
        let store = Arc::new(InMemoryProfiles::new());
        let mut profile = Profile::new("u1", "Maria", Role::Customer);
        profile.bag = lines();
        profile.addresses = vec![sample("Maria")];
        store.insert(profile).await;
        (Session::login("u1", store.clone(), "PHP").await.unwrap(), store)
    }

    struct DownOrders;

    #[async_trait]
    impl OrderStore for DownOrders {
        async fn create_order(&self, _new: NewOrder) -> Result<Order> { Err(CommerceError::Remote("order store unavailable".into())) }
        async fn list_orders(&self, _role: Role, _uid: &str) -> Result<Vec<Order>> { Ok(vec![]) }
        async fn get_order(&self, _order_id: &str) -> Result<Option<Order>> { Ok(None) }
        async fn set_order_status(&self, order_id: &str, _from: OrderStatus, _to: OrderStatus) -> Result<()> { Err(CommerceError::not_found("order", order_id)) }
        async fn set_tracking(&self, order_id: &str, _number: &str, _courier: &str) -> Result<()> { Err(CommerceError::not_found("order", order_id)) }
    }

    #[test]
    fn test_quote_totals() {
        let cart = Cart::from_lines(lines(), "PHP");
        let standard = quote(&cart, DeliveryMethod::Standard, &php(120)).unwrap();
        assert_eq!(standard.subtotal, php(1300));
        assert_eq!(standard.shipping, php(120));
        assert_eq!(standard.grand_total, php(1420));
        let pickup = quote(&cart, DeliveryMethod::Pickup, &php(120)).unwrap();
        assert_eq!(pickup.grand_total, php(1300));
        assert!(pickup.shipping.is_zero());
    }

    #[tokio::test]
    async fn test_standard_without_address_is_rejected() {
        let mut session = guest_with_cart();
        let orders = InMemoryOrders::new();
        let publisher = RecordingPublisher::new();
        let checkout = Checkout::open(session.addresses(), &Settings::default());
        assert!(matches!(checkout.submit(&mut session, &orders, &publisher).await, Err(CommerceError::MissingAddress)));
        assert!(orders.list_orders(Role::Admin, "admin").await.unwrap().is_empty());
        assert_eq!(session.cart().lines().len(), 2);
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_pickup_without_address_succeeds() {
        let mut session = guest_with_cart();
        let orders = InMemoryOrders::new();
        let mut checkout = Checkout::open(session.addresses(), &Settings::default());
        checkout.delivery_method = DeliveryMethod::Pickup;
        checkout.payment_method = PaymentMethod::GCash;
        let order = checkout.submit(&mut session, &orders, &RecordingPublisher::new()).await.unwrap();
        assert_eq!(order.total_amount(), &php(1300));
        assert!(order.shipping_address().is_none());
        assert_eq!(order.customer_id(), "guest_1");
        assert!(session.cart().cart().is_empty());
    }

    #[tokio::test]
    async fn test_submit_freezes_cart_and_clears_bag() {
        let (mut session, profiles) = member_with_cart().await;
        let orders = InMemoryOrders::new();
        let publisher = RecordingPublisher::new();
        let checkout = Checkout::open(session.addresses(), &Settings::default());
        let order = checkout.submit(&mut session, &orders, &publisher).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.total_amount(), &php(1420));
        assert_eq!(order.items(), lines().as_slice());
        assert_eq!(order.customer_name(), "Maria");
        assert_eq!(order.shipping_address().unwrap().full_name, "Maria");
        assert!(session.cart().cart().is_empty());
        assert!(profiles.get_profile("u1").await.unwrap().unwrap().bag.is_empty());

        let events = publisher.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject(), "tataknorte.orders.placed");
    }

    #[tokio::test]
    async fn test_failed_create_keeps_cart() {
        let (mut session, profiles) = member_with_cart().await;
        let publisher = RecordingPublisher::new();
        let checkout = Checkout::open(session.addresses(), &Settings::default());
        assert!(matches!(checkout.submit(&mut session, &DownOrders, &publisher).await, Err(CommerceError::Remote(_))));
        assert_eq!(session.cart().cart().item_count(), 3);
        assert_eq!(profiles.get_profile("u1").await.unwrap().unwrap().bag.len(), 2);
        assert!(publisher.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_currency_cart_places_nothing() {
        let mut stored = lines();
        stored.push(CartLine { product: Product::new("U", "Import", Money::new(Decimal::new(9000, 0), "USD"), None), quantity: 1, selected_variation: None });
        let mut session = Session::resume_guest("guest_1".into(), Cart::from_lines(stored, "PHP"), AddressBook::default(), Arc::new(InMemoryProfiles::new()));
        let orders = InMemoryOrders::new();
        let mut checkout = Checkout::open(session.addresses(), &Settings::default());
        checkout.delivery_method = DeliveryMethod::Pickup;
        assert!(matches!(checkout.submit(&mut session, &orders, &RecordingPublisher::new()).await, Err(CommerceError::Validation(_))));
        assert!(orders.list_orders(Role::Admin, "admin").await.unwrap().is_empty());
        assert_eq!(session.cart().lines().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let mut session = Session::guest(None, Arc::new(InMemoryProfiles::new()), "PHP");
        let mut checkout = Checkout::open(session.addresses(), &Settings::default());
        checkout.delivery_method = DeliveryMethod::Pickup;
        assert!(matches!(checkout.submit(&mut session, &InMemoryOrders::new(), &RecordingPublisher::new()).await, Err(CommerceError::EmptyCart)));
    }
}
