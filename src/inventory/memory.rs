use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, instrument};
use crate::domain::{Product, ProductId};
use super::{InventoryApi, InventoryError};

/// Product store held in process, with switches to simulate backend failures.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    next_id: ProductId,
    failing_updates: HashSet<ProductId>,
    offline: bool,
    gate: Option<Arc<Notify>>,
}

impl MemoryState {
    fn insert(&mut self, mut product: Product) -> Product {
        let id = match product.id {
            Some(id) => id,
            None => self.next_id + 1,
        };
        self.next_id = self.next_id.max(id);
        product.id = Some(id);
        self.products.insert(id, product.clone());
        product
    }

    fn reachable(&self) -> Result<(), InventoryError> {
        if self.offline { return Err(InventoryError::Transport("inventory offline".into())); }
        Ok(())
    }
}

fn not_found() -> InventoryError {
    InventoryError::Status { status: 404, reason: "Not Found".into() }
}

impl MemoryInventory {
    pub fn new() -> Self { Self::default() }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut state = MemoryState::default();
        for p in products { state.insert(p); }
        Self { inner: Mutex::new(state) }
    }

    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.inner.lock().await.products.get(&id).cloned()
    }

    /// Overwrites a product behind the store's back, as another client would.
    pub async fn put(&self, product: Product) -> Product {
        self.inner.lock().await.insert(product)
    }

    /// Makes every update of `id` fail with a 500.
    pub async fn fail_updates_for(&self, id: ProductId) {
        self.inner.lock().await.failing_updates.insert(id);
    }

    pub async fn set_offline(&self, offline: bool) {
        self.inner.lock().await.offline = offline;
    }

    /// Parks the next backend call until the returned handle is notified.
    pub async fn hold_next_call(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().await.gate = Some(gate.clone());
        gate
    }

    async fn pass_gate(&self) {
        let gate = self.inner.lock().await.gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

impl InventoryApi for MemoryInventory {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, InventoryError> {
        self.pass_gate().await;
        let state = self.inner.lock().await;
        state.reachable()?;
        Ok(state.products.values().cloned().collect())
    }

    #[instrument(skip(self, product))]
    async fn create_product(&self, product: &Product) -> Result<Option<Product>, InventoryError> {
        self.pass_gate().await;
        let mut state = self.inner.lock().await;
        state.reachable()?;
        let mut fresh = product.clone();
        fresh.id = None;
        let stored = state.insert(fresh);
        debug!(id = ?stored.id, "Product stored");
        Ok(Some(stored))
    }

    #[instrument(skip(self, product))]
    async fn update_product(&self, id: ProductId, product: &Product) -> Result<Option<Product>, InventoryError> {
        self.pass_gate().await;
        let mut state = self.inner.lock().await;
        state.reachable()?;
        if state.failing_updates.contains(&id) {
            return Err(InventoryError::Status { status: 500, reason: "Internal Server Error".into() });
        }
        if !state.products.contains_key(&id) { return Err(not_found()); }
        let updated = Product { id: Some(id), ..product.clone() };
        state.products.insert(id, updated.clone());
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), InventoryError> {
        self.pass_gate().await;
        let mut state = self.inner.lock().await;
        state.reachable()?;
        state.products.remove(&id).map(|_| ()).ok_or_else(not_found)
    }
}
