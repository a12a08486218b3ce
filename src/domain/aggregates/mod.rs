//! Aggregates module
pub mod product;
pub mod cart;
pub mod address;
pub mod profile;
pub mod order;
pub mod seller_application;

pub use product::{Category, DisplayPrice, Product, Variation};
pub use cart::{Cart, CartError, CartLine};
pub use address::{Address, AddressBook, AddressError};
pub use profile::{Profile, ProfilePatch, Role};
pub use order::{DeliveryMethod, NewOrder, Order, OrderError, OrderStatus, PaymentMethod, SellerOrderView};
pub use seller_application::{ApplicationError, ApplicationForm, ApplicationStatus, SellerApplication};
