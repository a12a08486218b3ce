//! The Order Pipeline: session state, cart, checkout, fulfilment and seller onboarding.

pub mod address_flow;
pub mod cart;
pub mod checkout;
pub mod fulfillment;
pub mod location;
pub mod onboarding;
pub mod session;

use crate::domain::aggregates::Role;

pub use address_flow::{AddressDraft, AddressFlow, AddressFlowError, AddressStep};
pub use cart::CartAggregator;
pub use checkout::{quote, Checkout, CheckoutQuote};
pub use fulfillment::OrderLifecycle;
pub use location::{Level, LocationCascade, LookupTicket, PlaceNames};
pub use onboarding::SellerOnboarding;
pub use session::{Identity, Session};

/// Who is performing an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub uid: String,
    pub role: Role,
    pub guest: bool,
}

impl Actor {
    pub fn new(uid: impl Into<String>, role: Role) -> Self { Self { uid: uid.into(), role, guest: false } }
    pub fn guest(guest_id: impl Into<String>) -> Self { Self { uid: guest_id.into(), role: Role::Customer, guest: true } }
}
