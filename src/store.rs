//! Screen state for the storefront.
//!
//! [`Store`] owns everything a client or company view shows: the catalog, the
//! cart, pending payment requests and the last error or success message.
//! Operations run one at a time. Every failure is returned to the caller and
//! also kept in `error_message` for display.

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    Cart, CartItem, CustomerInfo, DomainEvent, InventoryEvent, Money, PaymentRequest, Product,
    ProductForm, ProductId,
};
use crate::inventory::InventoryApi;
use crate::{Result, StoreError};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, Default, Serialize)]
pub struct StoreState {
    pub products: Vec<Product>,
    pub loading: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub cart: Cart,
    pub payment_requests: Vec<PaymentRequest>,
    /// Latest request the company side has not looked at yet.
    pub new_request: Option<PaymentRequest>,
}

impl StoreState {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == Some(id))
    }

    fn request_mut(&mut self, id: Uuid) -> Result<&mut PaymentRequest> {
        self.payment_requests.iter_mut().find(|r| r.id() == id).ok_or(StoreError::RequestNotFound)
    }

    fn check_cart_stock(&self) -> Result<()> {
        for item in self.cart.items() {
            let available = item.product_id().and_then(|id| self.product(id)).map(Product::available);
            match available {
                Some(stock) if stock >= item.quantity => {}
                other => {
                    return Err(StoreError::InsufficientStock {
                        name: item.product.name.clone(),
                        available: other.unwrap_or(0),
                        requested: item.quantity,
                    })
                }
            }
        }
        Ok(())
    }

    fn mirror(&mut self, updated: &[Product]) {
        for product in updated {
            if let Some(slot) = self.products.iter_mut().find(|p| p.id.is_some() && p.id == product.id) {
                *slot = product.clone();
            }
        }
    }

    /// Stores the outcome of a local (non-network) operation.
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.error_message = None,
            Err(e) => self.error_message = Some(e.to_string()),
        }
        result
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Company checkout: stock already decremented.
    Sale { total: Money, updated: Vec<Product> },
    /// Client checkout: waiting for the company.
    Requested { request: PaymentRequest },
}

impl CheckoutOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Sale { .. } => "Sale processed. Stock updated.",
            Self::Requested { .. } => "Payment request sent. Waiting for company confirmation.",
        }
    }
}

pub struct Store<A> {
    api: A,
    state: RwLock<StoreState>,
    ops: Mutex<()>,
    events: broadcast::Sender<DomainEvent>,
}

impl<A: InventoryApi> Store<A> {
    pub fn new(api: A) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { api, state: RwLock::new(StoreState::default()), ops: Mutex::new(()), events }
    }

    pub fn api(&self) -> &A { &self.api }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> { self.events.subscribe() }

    pub async fn snapshot(&self) -> StoreState { self.state.read().await.clone() }

    pub async fn products(&self) -> Vec<Product> { self.state.read().await.products.clone() }

    pub async fn cart(&self) -> Cart { self.state.read().await.cart.clone() }

    pub async fn payment_requests(&self) -> Vec<PaymentRequest> {
        self.state.read().await.payment_requests.clone()
    }

    pub async fn latest_request(&self) -> Option<PaymentRequest> {
        self.state.read().await.new_request.clone()
    }

    // ========== Catalog ==========

    #[instrument(skip(self))]
    pub async fn load_products(&self) -> Result<usize> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result = self.fetch_products().await;
        self.settle(result, None).await
    }

    #[instrument(skip(self, form), fields(name = %form.name))]
    pub async fn add_product(&self, form: ProductForm) -> Result<Product> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result: Result<Product> = async {
            let product = form.into_product(None)?;
            let created = self.api.create_product(&product).await.map_err(StoreError::inventory("adding product"))?;
            Ok(created.unwrap_or(product))
        }
        .await;
        if result.is_ok() { self.refresh_after_write().await; }
        self.settle(result, Some("Product added successfully")).await
    }

    #[instrument(skip(self, form))]
    pub async fn update_product(&self, id: ProductId, form: ProductForm) -> Result<Product> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result: Result<Product> = async {
            let product = form.into_product(Some(id))?;
            let updated = self.api.update_product(id, &product).await.map_err(StoreError::inventory("updating product"))?;
            Ok(updated.unwrap_or(product))
        }
        .await;
        if result.is_ok() { self.refresh_after_write().await; }
        self.settle(result, Some("Product updated successfully")).await
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result = self.api.delete_product(id).await.map_err(StoreError::inventory("deleting product"));
        if result.is_ok() { self.refresh_after_write().await; }
        self.settle(result, Some("Product deleted successfully")).await
    }

    /// True when every form field is present and parses.
    pub fn validate_fields(&self, form: &ProductForm) -> bool {
        form.validate().is_ok()
    }

    // ========== Cart ==========

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, product_id: ProductId) -> Result<u32> {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let product = s.product(product_id).cloned();
        let result = match product {
            Some(product) => s.cart.add_one(&product, product.available()).map_err(StoreError::from),
            None => Err(StoreError::ProductNotFound(product_id)),
        };
        s.record(result)
    }

    pub async fn increase_quantity(&self, product_id: ProductId) -> Result<u32> {
        self.add_to_cart(product_id).await
    }

    /// Takes one unit out of the cart; `None` when the product was not in it.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Option<u32> {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let remaining = s.cart.remove_one(product_id)?;
        s.error_message = None;
        Some(remaining)
    }

    pub async fn decrease_quantity(&self, product_id: ProductId) -> Option<u32> {
        self.remove_from_cart(product_id).await
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let known_stock = s.product(product_id).map(Product::available);
        let available = known_stock.unwrap_or_else(|| {
            s.cart.items().iter().find(|i| i.product_id() == Some(product_id)).map(|i| i.product.available()).unwrap_or(0)
        });
        let result = s.cart.set_quantity(product_id, quantity, available).map_err(StoreError::from);
        s.record(result)
    }

    #[instrument(skip(self))]
    pub async fn remove_product_from_cart(&self, product_id: ProductId) -> Result<()> {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let result = s.cart.remove_item(product_id).map_err(StoreError::from);
        s.record(result)
    }

    pub async fn clear_cart(&self) {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        s.cart.clear();
        s.error_message = None;
        s.success_message = None;
    }

    pub async fn cart_total(&self) -> Money { self.state.read().await.cart.total() }

    pub async fn cart_summary(&self) -> String { self.state.read().await.cart.summary() }

    /// Checks every cart line against the last fetched stock.
    pub async fn validate_cart_stock(&self) -> Result<()> {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let result = s.check_cart_stock();
        if let Err(e) = &result { s.error_message = Some(e.to_string()); }
        result
    }

    // ========== Payments ==========

    /// Checks out the cart. Without customer details this is a direct company
    /// sale; with them it becomes a pending payment request.
    #[instrument(skip(self, customer), fields(direct_sale = customer.is_none()))]
    pub async fn process_payment(&self, customer: Option<CustomerInfo>) -> Result<CheckoutOutcome> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result: Result<CheckoutOutcome> = async {
            {
                let s = self.state.read().await;
                if s.cart.is_empty() { return Err(StoreError::EmptyCart); }
                s.check_cart_stock()?;
            }
            match customer {
                None => self.direct_sale().await,
                Some(customer) => self.request_payment(customer).await,
            }
        }
        .await;
        let message = result.as_ref().ok().map(CheckoutOutcome::message);
        self.settle(result, message).await
    }

    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, request_id: Uuid) -> Result<PaymentRequest> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result: Result<PaymentRequest> = async {
            let lines = {
                let mut s = self.state.write().await;
                let request = s.request_mut(request_id)?;
                request.ensure_pending()?;
                request.lines().to_vec()
            };
            self.decrement_stock(&lines).await?;
            let (confirmed, events) = {
                let mut s = self.state.write().await;
                let request = s.request_mut(request_id)?;
                request.confirm()?;
                let events = request.take_events();
                (request.clone(), events)
            };
            self.publish(events);
            info!(request = %confirmed.short_id(), "Payment confirmed");
            self.refresh_after_write().await;
            Ok(confirmed)
        }
        .await;
        self.settle(result, Some("Payment confirmed. Stock updated successfully.")).await
    }

    #[instrument(skip(self))]
    pub async fn reject_payment(&self, request_id: Uuid) -> Result<PaymentRequest> {
        let _op = self.ops.lock().await;
        self.start().await;
        let result: Result<(PaymentRequest, Vec<DomainEvent>)> = async {
            let mut s = self.state.write().await;
            let request = s.request_mut(request_id)?;
            request.reject()?;
            let events = request.take_events();
            Ok((request.clone(), events))
        }
        .await;
        let result = result.map(|(rejected, events)| {
            self.publish(events);
            rejected
        });
        self.settle(result, Some("Payment request rejected.")).await
    }

    pub async fn mark_request_seen(&self) {
        self.state.write().await.new_request = None;
    }

    /// Drops a confirmed or rejected request. Pending requests stay.
    pub async fn remove_processed_request(&self, request_id: Uuid) -> bool {
        let _op = self.ops.lock().await;
        let mut s = self.state.write().await;
        let before = s.payment_requests.len();
        s.payment_requests.retain(|r| !(r.id() == request_id && r.is_processed()));
        s.payment_requests.len() != before
    }

    pub async fn request_summary(&self, request_id: Uuid) -> Result<String> {
        let s = self.state.read().await;
        s.payment_requests.iter().find(|r| r.id() == request_id).map(PaymentRequest::summary).ok_or(StoreError::RequestNotFound)
    }

    // ========== Messages ==========

    pub async fn clear_error(&self) { self.state.write().await.error_message = None; }

    pub async fn clear_success(&self) { self.state.write().await.success_message = None; }

    pub async fn set_error(&self, message: Option<String>) { self.state.write().await.error_message = message; }

    // ========== Internals ==========

    async fn start(&self) {
        let mut s = self.state.write().await;
        s.loading = true;
        s.error_message = None;
        s.success_message = None;
    }

    async fn settle<T>(&self, result: Result<T>, success: Option<&str>) -> Result<T> {
        let mut s = self.state.write().await;
        s.loading = false;
        match &result {
            Ok(_) => s.success_message = success.map(str::to_string),
            Err(e) => {
                warn!(error = %e, "Operation failed");
                s.error_message = Some(e.to_string());
            }
        }
        result
    }

    async fn fetch_products(&self) -> Result<usize> {
        let products = self.api.list_products().await.map_err(StoreError::inventory("loading products"))?;
        let count = products.len();
        self.state.write().await.products = products;
        info!(count, "Products loaded");
        Ok(count)
    }

    async fn refresh_after_write(&self) {
        if let Err(e) = self.fetch_products().await {
            warn!(error = %e, "Refresh after write failed, keeping previous catalog");
        }
    }

    async fn direct_sale(&self) -> Result<CheckoutOutcome> {
        let (lines, total) = {
            let s = self.state.read().await;
            (s.cart.items().to_vec(), s.cart.total())
        };
        let updated = self.decrement_stock(&lines).await?;
        self.state.write().await.cart.clear();
        self.publish(vec![DomainEvent::Inventory(InventoryEvent::SaleCompleted { total: total.amount() })]);
        info!(total = %total, "Direct sale completed");
        self.refresh_after_write().await;
        Ok(CheckoutOutcome::Sale { total, updated })
    }

    async fn request_payment(&self, customer: CustomerInfo) -> Result<CheckoutOutcome> {
        let (request, events) = {
            let mut s = self.state.write().await;
            let mut request = PaymentRequest::create(s.cart.items().to_vec(), s.cart.total(), Some(customer));
            let events = request.take_events();
            s.payment_requests.push(request.clone());
            s.new_request = Some(request.clone());
            s.cart.clear();
            (request, events)
        };
        self.publish(events);
        info!(request = %request.short_id(), total = %request.total(), "Payment request created");
        Ok(CheckoutOutcome::Requested { request })
    }

    /// Decrements remote stock line by line, stopping at the first failure.
    /// Updates that already went through stay applied and are mirrored locally.
    async fn decrement_stock(&self, lines: &[CartItem]) -> Result<Vec<Product>> {
        let mut applied = Vec::with_capacity(lines.len());
        let outcome = self.apply_decrements(lines, &mut applied).await;
        self.state.write().await.mirror(&applied);
        if let Err(e) = &outcome {
            if !applied.is_empty() {
                warn!(applied = applied.len(), error = %e, "Stock decrement stopped part way");
            }
        }
        outcome.map(|_| applied)
    }

    async fn apply_decrements(&self, lines: &[CartItem], applied: &mut Vec<Product>) -> Result<()> {
        for line in lines {
            let name = &line.product.name;
            let current = {
                let s = self.state.read().await;
                line.product_id().and_then(|id| s.product(id)).cloned()
            }
            .ok_or_else(|| StoreError::ProductNotInInventory(name.clone()))?;
            let updated = current.with_stock_removed(line.quantity).map_err(|_| StoreError::InsufficientStock {
                name: name.clone(),
                available: current.available(),
                requested: line.quantity,
            })?;
            let stored = self
                .api
                .update_existing(&updated)
                .await
                .map_err(|source| StoreError::StockUpdateFailed { name: name.clone(), source })?
                .unwrap_or(updated);
            if let Some(product_id) = stored.id {
                self.publish(vec![DomainEvent::Inventory(InventoryEvent::StockDecremented {
                    product_id,
                    quantity: line.quantity,
                    remaining: stored.stock,
                })]);
            }
            applied.push(stored);
        }
        Ok(())
    }

    fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}
