//! Inventory backend access.
//!
//! The backend exposes four calls over the product resource. [`HttpInventory`]
//! talks to the real service, [`MemoryInventory`] keeps products in process.

use std::future::Future;
use crate::domain::{Product, ProductId};

mod http;
mod memory;

pub use http::HttpInventory;
pub use memory::MemoryInventory;

pub trait InventoryApi: Send + Sync + 'static {
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, InventoryError>> + Send;

    /// Returns the stored product when the backend echoes it back.
    fn create_product(&self, product: &Product) -> impl Future<Output = Result<Option<Product>, InventoryError>> + Send;

    fn update_product(&self, id: ProductId, product: &Product) -> impl Future<Output = Result<Option<Product>, InventoryError>> + Send;

    fn delete_product(&self, id: ProductId) -> impl Future<Output = Result<(), InventoryError>> + Send;

    /// Updates `product` under its own id.
    fn update_existing(&self, product: &Product) -> impl Future<Output = Result<Option<Product>, InventoryError>> + Send {
        async move {
            let id = product.id.ok_or(InventoryError::MissingId)?;
            self.update_product(id, product).await
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("Error {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("Connection error: {0}")]
    Transport(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Product must have an id to be updated")]
    MissingId,
}

impl InventoryError {
    pub fn is_not_found(&self) -> bool { matches!(self, Self::Status { status: 404, .. }) }
}
