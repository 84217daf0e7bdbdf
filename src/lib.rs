//! Storefront
//!
//! Cart and payment-request workflow over a REST inventory backend.
//!
//! ## Features
//! - Product catalog mirrored from the inventory service
//! - Shopping cart bounded by last-known stock
//! - Payment requests raised by clients, approved or rejected by the company
//! - Direct company sales
//! - Stock decremented per line item on confirmation

pub mod api;
pub mod config;
pub mod domain;
pub mod inventory;
pub mod store;

use thiserror::Error;
use crate::domain::{CartError, PaymentError, ProductError, ProductId};
use crate::inventory::InventoryError;

pub use store::{CheckoutOutcome, Store, StoreState};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Product {0} not found in inventory")]
    ProductNotFound(ProductId),

    #[error("Product '{0}' not found in inventory")]
    ProductNotInInventory(String),

    #[error("Insufficient stock for {name}. Available: {available}, requested: {requested}")]
    InsufficientStock { name: String, available: u32, requested: u32 },

    #[error("The cart is empty")]
    EmptyCart,

    #[error("Payment request not found")]
    RequestNotFound,

    #[error("Error {action}: {source}")]
    Inventory { action: &'static str, source: InventoryError },

    #[error("Error updating stock of {name}: {source}")]
    StockUpdateFailed { name: String, source: InventoryError },

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Product(#[from] ProductError),
}

impl StoreError {
    pub(crate) fn inventory(action: &'static str) -> impl FnOnce(InventoryError) -> StoreError {
        move |source| StoreError::Inventory { action, source }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
