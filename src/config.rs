use std::time::Duration;

pub const DEFAULT_INVENTORY_URL: &str = "http://10.157.65.71:8080/api/";
const DEFAULT_PORT: u16 = 8083;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub inventory_base_url: String,
    pub port: u16,
    pub inventory_timeout: Duration,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let inventory_base_url = lookup("INVENTORY_BASE_URL").unwrap_or_else(|| DEFAULT_INVENTORY_URL.to_string());
        let port = match lookup("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT", v))?,
            None => DEFAULT_PORT,
        };
        let timeout_secs = match lookup("INVENTORY_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("INVENTORY_TIMEOUT_SECS", v))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        tracing::info!("Config loaded");
        Ok(Self { inventory_base_url, port, inventory_timeout: Duration::from_secs(timeout_secs) })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}
