//! Aggregates module
pub mod product;
pub mod payment_request;
pub mod cart;

pub use product::{Product, ProductError, ProductForm, ProductId};
pub use payment_request::{CustomerInfo, PaymentError, PaymentRequest, PaymentStatus};
pub use cart::{Cart, CartError, CartItem};
