//! Product Aggregate
//!
//! Mirrors the inventory backend's product entity. Local copies only change
//! after the backend accepted a write.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};
use crate::domain::value_objects::Money;

pub type ProductId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<ProductId>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "precio", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Signed like the backend's column; zero or below means sold out.
    pub stock: i32,
    #[serde(rename = "marcaId")]
    pub brand_id: i32,
    #[serde(rename = "categoriaId")]
    pub category_id: i32,
    #[serde(rename = "imagenUrl")]
    pub image_url: String,
}

impl Product {
    pub fn unit_price(&self) -> Money { Money::cop(self.price) }

    /// Units that can still be sold.
    pub fn available(&self) -> u32 { u32::try_from(self.stock).unwrap_or(0) }

    /// Copy of this product with `quantity` units taken out of stock.
    pub fn with_stock_removed(&self, quantity: u32) -> Result<Product, ProductError> {
        let available = self.available();
        if quantity > available {
            return Err(ProductError::InsufficientInventory { available, requested: quantity });
        }
        // quantity <= available <= i32::MAX
        Ok(Product { stock: self.stock - quantity as i32, ..self.clone() })
    }
}

/// Raw product fields as typed by a company user.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProductForm {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[validate(custom = "decimal_text")]
    pub price: String,
    #[validate(custom = "integer_text")]
    pub stock: String,
    #[validate(custom = "integer_text")]
    pub brand_id: String,
    #[validate(custom = "integer_text")]
    pub category_id: String,
    #[serde(default)]
    pub image_url: String,
}

impl ProductForm {
    /// Parses the form into a product carrying `id`.
    pub fn into_product(self, id: Option<ProductId>) -> Result<Product, ProductError> {
        self.validate().map_err(|e| ProductError::InvalidForm(describe(&e)))?;
        let price = Decimal::from_str(self.price.trim()).map_err(|_| ProductError::InvalidForm("price".into()))?;
        let stock = self.stock.trim().parse::<i32>().map_err(|_| ProductError::InvalidForm("stock".into()))?;
        let brand_id = self.brand_id.trim().parse::<i32>().map_err(|_| ProductError::InvalidForm("brand_id".into()))?;
        let category_id = self.category_id.trim().parse::<i32>().map_err(|_| ProductError::InvalidForm("category_id".into()))?;
        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price,
            stock,
            brand_id,
            category_id,
            image_url: self.image_url.trim().to_string(),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone(),
            price: p.price.to_string(),
            stock: p.stock.to_string(),
            brand_id: p.brand_id.to_string(),
            category_id: p.category_id.to_string(),
            image_url: p.image_url.clone(),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::new("blank")); }
    Ok(())
}

fn decimal_text(value: &str) -> Result<(), ValidationError> {
    Decimal::from_str(value.trim()).map(|_| ()).map_err(|_| ValidationError::new("not_a_number"))
}

fn integer_text(value: &str) -> Result<(), ValidationError> {
    value.trim().parse::<i32>().map(|_| ()).map_err(|_| ValidationError::new("not_an_integer"))
}

fn describe(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
    fields.sort_unstable();
    fields.join(", ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProductError {
    #[error("Invalid product fields: {0}")]
    InvalidForm(String),
    #[error("Insufficient inventory: available {available}, requested {requested}")]
    InsufficientInventory { available: u32, requested: u32 },
}
