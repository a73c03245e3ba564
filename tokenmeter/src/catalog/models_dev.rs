//! models.dev catalog: fetch https://models.dev/api.json and read each model's context limit.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{CatalogError, CatalogSource, ModelCatalog};

/// Default models.dev API URL.
pub const DEFAULT_MODELS_DEV_URL: &str = "https://models.dev/api.json";

/// Fetches a body from a URL. Abstraction for testing.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET the URL and return the response body as string.
    async fn get(&self, url: &str) -> Result<String, String>;
}

/// Reqwest-based HTTP client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<String, String> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .text()
            .await
            .map_err(|e| e.to_string())
    }
}

/// Loads the catalog from models.dev (or any URL serving a compatible body).
pub struct ModelsDevCatalog {
    url: String,
    http_client: Arc<dyn HttpClient>,
}

impl ModelsDevCatalog {
    /// Default URL and reqwest client.
    pub fn new() -> Self {
        Self::with_client(
            DEFAULT_MODELS_DEV_URL.to_string(),
            Arc::new(ReqwestHttpClient::default()),
        )
    }

    pub fn with_client(url: String, http_client: Arc<dyn HttpClient>) -> Self {
        Self { url, http_client }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for ModelsDevCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for ModelsDevCatalog {
    async fn load(&self) -> Result<ModelCatalog, CatalogError> {
        let body = self
            .http_client
            .get(&self.url)
            .await
            .map_err(CatalogError::Fetch)?;
        let catalog = ModelCatalog::from_json(&body)?;
        tracing::info!(url = %self.url, models = catalog.len(), "model catalog loaded");
        Ok(catalog)
    }
}

/// `limit.context` of a models.dev model object.
pub(crate) fn parse_context_limit(model: &Value) -> Option<u32> {
    let context = model.get("limit")?.get("context")?.as_u64()?;
    u32::try_from(context).ok()
}
