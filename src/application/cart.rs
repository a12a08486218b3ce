//! Cart Aggregator
//!
//! Wraps the [`Cart`] aggregate and mirrors it to the owner's profile `bag`
//! after every mutation. The UI is optimistic: a failed mirror is logged and
//! the local change stands. There is no retry or later reconciliation, so a
//! failed write leaves the stored bag behind until the next successful one.

use std::sync::Arc;

use crate::domain::aggregates::{Cart, CartLine, Product, Variation};
use crate::domain::value_objects::{LineKey, Money};
use crate::services::ProfileStore;
use crate::Result;

pub struct CartAggregator {
    cart: Cart,
    /// Profile the cart is mirrored to; `None` for guests.
    owner: Option<String>,
    profiles: Arc<dyn ProfileStore>,
}

impl CartAggregator {
    pub fn new(cart: Cart, owner: Option<String>, profiles: Arc<dyn ProfileStore>) -> Self { Self { cart, owner, profiles } }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn lines(&self) -> &[CartLine] { self.cart.lines() }
    pub fn total(&self) -> Result<Money> { Ok(self.cart.total()?) }
    pub fn into_cart(self) -> Cart { self.cart }

    pub async fn add(&mut self, product: Product, variation: Option<Variation>, quantity: u32) -> Result<&[CartLine]> {
        let product_id = product.id.clone();
        self.cart.add(product, variation, quantity)?;
        tracing::debug!(product_id = %product_id, quantity, "Added to cart");
        self.mirror().await;
        Ok(self.cart.lines())
    }

    /// Unknown keys are ignored and nothing is written.
    pub async fn update_quantity(&mut self, key: &LineKey, delta: i32) -> &[CartLine] {
        if self.cart.update_quantity(key, delta) { self.mirror().await; }
        self.cart.lines()
    }

    pub async fn remove(&mut self, key: &LineKey) -> &[CartLine] {
        if self.cart.remove(key) { self.mirror().await; }
        self.cart.lines()
    }

    pub async fn clear(&mut self) {
        self.cart.clear();
        self.mirror().await;
    }

    async fn mirror(&self) {
        let Some(uid) = self.owner.as_deref() else { return };
        if let Err(e) = self.profiles.save_bag(uid, self.cart.lines()).await {
            tracing::warn!(uid, lines = self.cart.len(), error = %e, "Failed to mirror cart to profile; keeping local state");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use crate::domain::aggregates::{Profile, ProfilePatch, Role};
    use crate::services::InMemoryProfiles;
    use crate::CommerceError;

    /// Profile store whose writes always fail.
    pub(crate) struct OfflineProfiles;

    #[async_trait]
    impl ProfileStore for OfflineProfiles {
        async fn get_profile(&self, _uid: &str) -> Result<Option<Profile>> { Err(CommerceError::Remote("offline".into())) }
        async fn save_bag(&self, _uid: &str, _lines: &[CartLine]) -> Result<()> { Err(CommerceError::Remote("offline".into())) }
        async fn save_profile_fields(&self, _uid: &str, _patch: ProfilePatch) -> Result<()> { Err(CommerceError::Remote("offline".into())) }
    }

    fn jar() -> Product { Product::new("A", "Burnay Jar", Money::php(Decimal::new(500, 0)), Some("S1".into())) }

    async fn member_cart() -> (CartAggregator, Arc<InMemoryProfiles>) {
        let store = Arc::new(InMemoryProfiles::new());
        store.insert(Profile::new("u1", "Juan", Role::Customer)).await;
        (CartAggregator::new(Cart::default(), Some("u1".into()), store.clone()), store)
    }

    #[tokio::test]
    async fn test_mutations_are_mirrored() {
        let (mut cart, store) = member_cart().await;
        cart.add(jar(), None, 1).await.unwrap();
        cart.add(jar(), None, 2).await.unwrap();
        assert_eq!(store.get_profile("u1").await.unwrap().unwrap().bag[0].quantity, 3);

        cart.update_quantity(&LineKey::product("A"), -10).await;
        assert_eq!(store.get_profile("u1").await.unwrap().unwrap().bag[0].quantity, 1);

        cart.remove(&LineKey::product("A")).await;
        assert!(store.get_profile("u1").await.unwrap().unwrap().bag.is_empty());
    }

    #[tokio::test]
    async fn test_clear_writes_empty_bag() {
        let (mut cart, store) = member_cart().await;
        cart.add(jar(), None, 1).await.unwrap();
        cart.clear().await;
        assert!(cart.cart().is_empty());
        assert!(store.get_profile("u1").await.unwrap().unwrap().bag.is_empty());
    }

    #[tokio::test]
    async fn test_guest_cart_is_not_mirrored() {
        let store = Arc::new(InMemoryProfiles::new());
        let mut cart = CartAggregator::new(Cart::default(), None, store);
        cart.add(jar(), None, 1).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mirror_keeps_local_change() {
        let mut cart = CartAggregator::new(Cart::default(), Some("u1".into()), Arc::new(OfflineProfiles));
        let lines = cart.add(jar(), None, 2).await.unwrap();
        assert_eq!(lines[0].quantity, 2);
        cart.update_quantity(&LineKey::product("A"), 1).await;
        assert_eq!(cart.total().unwrap().amount(), Decimal::new(1500, 0));
    }

    #[tokio::test]
    async fn test_validation_error_leaves_cart_untouched() {
        let (mut cart, _store) = member_cart().await;
        let shawl = jar().with_variation(Variation::new("red", "Red", Money::php(Decimal::new(600, 0))));
        assert!(matches!(cart.add(shawl, None, 1).await, Err(CommerceError::Validation(_))));
        assert!(cart.cart().is_empty());
    }
}
