use std::time::Duration;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use crate::config::ConfigError;
use crate::domain::{Product, ProductId};
use super::{InventoryApi, InventoryError};

/// REST client for the product resource.
#[derive(Clone, Debug)]
pub struct HttpInventory {
    client: Client,
    base_url: Url,
}

impl HttpInventory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let normalized = if base_url.ends_with('/') { base_url.to_string() } else { format!("{base_url}/") };
        let base_url = Url::parse(&normalized).map_err(|e| ConfigError::Invalid("INVENTORY_BASE_URL", e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid("INVENTORY_TIMEOUT_SECS", e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    fn endpoint(&self, path: &str) -> Result<Url, InventoryError> {
        self.base_url.join(path).map_err(|e| InventoryError::Transport(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> InventoryError {
    InventoryError::Transport(e.to_string())
}

fn check(response: Response) -> Result<Response, InventoryError> {
    let status = response.status();
    if status.is_success() { return Ok(response); }
    Err(InventoryError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

/// Reads an optional JSON body; empty bodies and `null` become `None`.
async fn optional_body<T: DeserializeOwned>(response: Response) -> Result<Option<T>, InventoryError> {
    let bytes = response.bytes().await.map_err(transport)?;
    if bytes.iter().all(u8::is_ascii_whitespace) { return Ok(None); }
    serde_json::from_slice::<Option<T>>(&bytes).map_err(|e| InventoryError::Decode(e.to_string()))
}

impl InventoryApi for HttpInventory {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, InventoryError> {
        debug!("Sending request");
        let response = self.client.get(self.endpoint("producto/listar")?).send().await.map_err(transport)?;
        let products: Option<Vec<Product>> = optional_body(check(response)?).await?;
        Ok(products.unwrap_or_default())
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: &Product) -> Result<Option<Product>, InventoryError> {
        debug!("Sending request");
        let response = self.client.post(self.endpoint("producto")?).json(product).send().await.map_err(transport)?;
        optional_body(check(response)?).await
    }

    #[instrument(skip(self, product))]
    async fn update_product(&self, id: ProductId, product: &Product) -> Result<Option<Product>, InventoryError> {
        debug!("Sending request");
        let response = self.client.put(self.endpoint(&format!("producto/{id}"))?).json(product).send().await.map_err(transport)?;
        optional_body(check(response)?).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), InventoryError> {
        debug!("Sending request");
        let response = self.client.delete(self.endpoint(&format!("producto/{id}"))?).send().await.map_err(transport)?;
        check(response)?;
        Ok(())
    }
}
