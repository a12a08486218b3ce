//! Per-user session state.
//!
//! Everything a storefront view needs to read or mutate for the current user
//! lives here and is passed by reference: identity, the cart, and the address
//! book.

use chrono::Utc;
use std::sync::Arc;

use super::{cart::CartAggregator, Actor};
use crate::domain::aggregates::{Address, AddressBook, Cart, ProfilePatch, Role};
use crate::services::ProfileStore;
use crate::{CommerceError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Authenticated { uid: String, display_name: String, role: Role },
    /// Carts of guests are held in memory only.
    Guest { guest_id: String },
}

pub struct Session {
    identity: Identity,
    cart: CartAggregator,
    addresses: AddressBook,
    profiles: Arc<dyn ProfileStore>,
    currency: String,
}

impl Identity {
    pub fn new_guest() -> Self { Self::Guest { guest_id: format!("guest_{}", Utc::now().timestamp_millis()) } }

    pub fn uid(&self) -> &str {
        match self { Self::Authenticated { uid, .. } => uid, Self::Guest { guest_id } => guest_id }
    }
}

impl Session {
    pub fn guest(guest_id: Option<String>, profiles: Arc<dyn ProfileStore>, currency: &str) -> Self {
        let identity = guest_id.map_or_else(Identity::new_guest, |guest_id| Identity::Guest { guest_id });
        Self { identity, cart: CartAggregator::new(Cart::new(currency), None, profiles.clone()), addresses: AddressBook::default(), profiles, currency: currency.to_string() }
    }

    /// Restores a guest session around state the caller kept in memory.
    pub fn resume_guest(guest_id: String, cart: Cart, addresses: AddressBook, profiles: Arc<dyn ProfileStore>) -> Self {
        let currency = cart.currency().to_string();
        Self { identity: Identity::Guest { guest_id }, cart: CartAggregator::new(cart, None, profiles.clone()), addresses, profiles, currency }
    }

    /// Hydrates cart, address book and role from the stored profile.
    pub async fn login(uid: &str, profiles: Arc<dyn ProfileStore>, currency: &str) -> Result<Self> {
        let profile = profiles.get_profile(uid).await?.ok_or_else(|| CommerceError::not_found("profile", uid))?;
        tracing::info!(uid, role = profile.role.as_str(), lines = profile.bag.len(), "Session started");
        let cart = Cart::from_lines(profile.bag, currency);
        Ok(Self {
            identity: Identity::Authenticated { uid: profile.uid, display_name: profile.display_name, role: profile.role },
            cart: CartAggregator::new(cart, Some(uid.to_string()), profiles.clone()),
            addresses: AddressBook::new(profile.addresses),
            profiles,
            currency: currency.to_string(),
        })
    }

    /// Drops the user's state locally and continues as a fresh guest. The stored bag is left as is.
    pub fn logout(&mut self) {
        tracing::info!(uid = self.identity.uid(), "Session ended");
        self.identity = Identity::new_guest();
        self.cart = CartAggregator::new(Cart::new(&self.currency), None, self.profiles.clone());
        self.addresses = AddressBook::default();
    }

    pub fn identity(&self) -> &Identity { &self.identity }
    pub fn uid(&self) -> &str { self.identity.uid() }
    pub fn is_guest(&self) -> bool { matches!(self.identity, Identity::Guest { .. }) }

    pub fn display_name(&self) -> &str {
        match &self.identity { Identity::Authenticated { display_name, .. } => display_name, Identity::Guest { .. } => "Guest User" }
    }

    pub fn actor(&self) -> Actor {
        match &self.identity {
            Identity::Authenticated { uid, role, .. } => Actor::new(uid.clone(), *role),
            Identity::Guest { guest_id } => Actor::guest(guest_id.clone()),
        }
    }

    pub fn cart(&self) -> &CartAggregator { &self.cart }
    pub fn cart_mut(&mut self) -> &mut CartAggregator { &mut self.cart }
    pub fn into_parts(self) -> (Cart, AddressBook) { (self.cart.into_cart(), self.addresses) }
    pub fn addresses(&self) -> &AddressBook { &self.addresses }

    /// Appends an address and, for signed-in users, persists the whole list.
    /// Nothing changes locally when the write fails.
    pub async fn save_address(&mut self, address: Address) -> Result<Address> {
        let mut book = self.addresses.clone();
        let saved = book.append(address)?.clone();
        if let Identity::Authenticated { uid, .. } = &self.identity {
            let patch = ProfilePatch { addresses: Some(book.addresses().to_vec()), ..ProfilePatch::default() };
            self.profiles.save_profile_fields(uid, patch).await.map_err(|e| {
                tracing::warn!(uid = %uid, error = %e, "Failed to save address");
                e
            })?;
        }
        self.addresses = book;
        Ok(saved)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("identity", &self.identity).field("lines", &self.cart.cart().len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::tests::sample;
    use crate::domain::aggregates::order::tests::line;
    use crate::domain::aggregates::Profile;
    use crate::services::InMemoryProfiles;

    async fn store_with(profile: Profile) -> Arc<InMemoryProfiles> {
        let store = Arc::new(InMemoryProfiles::new());
        store.insert(profile).await;
        store
    }

    #[tokio::test]
    async fn test_login_hydrates_from_profile() {
        let mut profile = Profile::new("u1", "Juan", Role::Seller);
        profile.bag = vec![line("A", "S1", 500, 2)];
        profile.addresses = vec![sample("Juan")];
        let store = store_with(profile).await;
        let session = Session::login("u1", store, "PHP").await.unwrap();
        assert_eq!(session.cart().cart().item_count(), 2);
        assert_eq!(session.addresses().len(), 1);
        assert_eq!(session.actor(), Actor::new("u1", Role::Seller));
        assert!(!session.is_guest());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let store = Arc::new(InMemoryProfiles::new());
        assert!(matches!(Session::login("ghost", store, "PHP").await, Err(CommerceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_logout_clears_local_state_only() {
        let mut profile = Profile::new("u1", "Juan", Role::Customer);
        profile.bag = vec![line("A", "S1", 500, 2)];
        let store = store_with(profile).await;
        let mut session = Session::login("u1", store.clone(), "PHP").await.unwrap();
        session.logout();
        assert!(session.is_guest());
        assert!(session.uid().starts_with("guest_"));
        assert!(session.cart().cart().is_empty());
        assert_eq!(store.get_profile("u1").await.unwrap().unwrap().bag.len(), 1);
    }

    #[tokio::test]
    async fn test_save_address_persists_for_members() {
        let store = store_with(Profile::new("u1", "Juan", Role::Customer)).await;
        let mut session = Session::login("u1", store.clone(), "PHP").await.unwrap();
        session.save_address(sample("Juan")).await.unwrap();
        session.save_address(sample("Juan")).await.unwrap();
        assert_eq!(session.addresses().len(), 2);
        assert_eq!(store.get_profile("u1").await.unwrap().unwrap().addresses.len(), 2);
    }

    #[tokio::test]
    async fn test_guest_addresses_stay_local() {
        let store = Arc::new(InMemoryProfiles::new());
        let mut session = Session::guest(Some("guest_1".into()), store, "PHP");
        session.save_address(sample("Guest")).await.unwrap();
        assert_eq!(session.addresses().len(), 1);
        assert_eq!(session.display_name(), "Guest User");
    }
}
