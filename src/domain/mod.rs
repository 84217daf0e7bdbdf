//! Storefront domain: catalog products, the cart and payment requests.
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::{DomainEvent, InventoryEvent, PaymentEvent};
pub use value_objects::Money;
