//! Cart Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::{Product, ProductId};
use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};

/// In-memory cart. Lines keep the order products were first added in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn product_id(&self) -> Option<ProductId> { self.product.id }
    pub fn line_total(&self) -> Money { self.product.unit_price().multiply(self.quantity) }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    fn find(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == Some(id))
    }

    fn find_mut(&mut self, id: ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product.id == Some(id))
    }

    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.find(product_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Adds one unit of `product`, refusing to go past `available`.
    pub fn add_one(&mut self, product: &Product, available: u32) -> Result<u32, CartError> {
        let id = product.id.ok_or(CartError::MissingProductId)?;
        let current = self.quantity_of(id);
        if current >= available {
            return Err(CartError::OutOfStock { name: product.name.clone(), available });
        }
        match self.find_mut(id) {
            Some(existing) => {
                existing.product = product.clone();
                existing.quantity += 1;
            }
            None => self.items.push(CartItem { product: product.clone(), quantity: 1 }),
        }
        Ok(current + 1)
    }

    /// Takes one unit out. Returns the remaining quantity, `None` when the product was not in the cart.
    pub fn remove_one(&mut self, product_id: ProductId) -> Option<u32> {
        let item = self.find_mut(product_id)?;
        if item.quantity > 1 {
            item.quantity -= 1;
            return Some(item.quantity);
        }
        self.items.retain(|i| i.product.id != Some(product_id));
        Some(0)
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32, available: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity(quantity)); }
        let item = self.find_mut(product_id).ok_or(CartError::ItemNotFound)?;
        if quantity > available {
            return Err(CartError::OutOfStock { name: item.product.name.clone(), available });
        }
        item.quantity = quantity;
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != Some(product_id));
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn total(&self) -> Money {
        self.items.iter().fold(Money::zero(DEFAULT_CURRENCY), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    /// Multi-line human readable summary of the cart contents.
    pub fn summary(&self) -> String {
        if self.is_empty() { return "Cart is empty".to_string(); }
        let mut out = String::from("PURCHASE SUMMARY:\n\n");
        out.push_str(&render_lines(&self.items));
        out.push_str(&format!("TOTAL: {}", self.total()));
        out
    }
}

pub(crate) fn render_lines(items: &[CartItem]) -> String {
    items.iter().map(|i| {
        format!("• {}\n  Quantity: {}\n  Subtotal: {}\n\n", i.product.name, i.quantity, i.line_total())
    }).collect()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Product has no id")]
    MissingProductId,
    #[error("No more stock available of {name} (available: {available})")]
    OutOfStock { name: String, available: u32 },
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
}
