//! Model catalog: per-provider model lists with their input-token limits.
//!
//! Sources: models.dev over HTTP ([`ModelsDevCatalog`]), a local JSON file
//! ([`LocalFileCatalog`]), or an in-memory snapshot ([`StaticCatalog`]). All three parse
//! either catalog shape accepted by [`ModelCatalog::from_json`].
//!
//! # Example
//!
//! ```ignore
//! use tokenmeter::catalog::*;
//!
//! let catalog = ModelsDevCatalog::new().load().await?;
//! let limits = catalog.limits_for(&["gpt-4o", "claude-sonnet-4"]);
//! ```

mod local_file;
mod models_dev;

pub use local_file::LocalFileCatalog;
pub use models_dev::{HttpClient, ModelsDevCatalog, ReqwestHttpClient, DEFAULT_MODELS_DEV_URL};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Input-token limit of one model. Immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelLimit {
    #[serde(alias = "id")]
    pub model_id: String,
    pub max_input_tokens: u32,
}

impl ModelLimit {
    pub fn new(model_id: impl Into<String>, max_input_tokens: u32) -> Self {
        Self {
            model_id: model_id.into(),
            max_input_tokens,
        }
    }
}

/// Errors loading a catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("fetch catalog: {0}")]
    Fetch(String),
    #[error("parse catalog: {0}")]
    Parse(String),
    #[error("read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider name to its models, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    providers: BTreeMap<String, Vec<ModelLimit>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model under `provider`. Models with a zero limit are dropped.
    pub fn insert(&mut self, provider: impl Into<String>, limit: ModelLimit) {
        if limit.max_input_tokens == 0 {
            tracing::debug!(
                model_id = %limit.model_id,
                "skipping catalog model with zero input limit"
            );
            return;
        }
        self.providers.entry(provider.into()).or_default().push(limit);
    }

    pub fn providers(&self) -> impl Iterator<Item = (&str, &[ModelLimit])> {
        self.providers.iter().map(|(p, m)| (p.as_str(), m.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Limit for `model_id` from whichever provider lists it first.
    pub fn limit(&self, model_id: &str) -> Option<&ModelLimit> {
        self.providers
            .values()
            .flat_map(|models| models.iter())
            .find(|m| m.model_id == model_id)
    }

    /// Limits for the selected models, in selection order. Unknown ids are skipped.
    pub fn limits_for<S: AsRef<str>>(&self, model_ids: &[S]) -> Vec<ModelLimit> {
        model_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                let found = self.limit(id).cloned();
                if found.is_none() {
                    tracing::debug!(model_id = id, "selected model not in catalog");
                }
                found
            })
            .collect()
    }

    /// Parses a catalog in either shape:
    ///
    /// - `{"<provider>": [{"id": "...", "max_input_tokens": N}, ...]}`
    /// - models.dev: `{"<provider>": {"models": {"<id>": {"limit": {"context": N}}}}}`
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        let json: Value =
            serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let providers = json
            .as_object()
            .ok_or_else(|| CatalogError::Parse("root is not an object".to_string()))?;

        let mut out = Self::new();
        for (provider, entry) in providers {
            match entry {
                Value::Array(_) => {
                    let models: Vec<ModelLimit> = serde_json::from_value(entry.clone())
                        .map_err(|e| CatalogError::Parse(format!("{provider}: {e}")))?;
                    for m in models {
                        out.insert(provider.clone(), m);
                    }
                }
                Value::Object(obj) => {
                    let Some(models) = obj.get("models").and_then(Value::as_object) else {
                        continue;
                    };
                    for (model_id, model) in models {
                        if let Some(limit) = models_dev::parse_context_limit(model) {
                            out.insert(provider.clone(), ModelLimit::new(model_id.clone(), limit));
                        }
                    }
                }
                _ => continue,
            }
        }
        Ok(out)
    }
}

/// Somewhere a catalog snapshot can be loaded from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<ModelCatalog, CatalogError>;
}

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog(pub ModelCatalog);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn load(&self) -> Result<ModelCatalog, CatalogError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_provider_lists() {
        let body = r#"{
            "openai": [{"id": "gpt-4o", "max_input_tokens": 128000}],
            "anthropic": [{"id": "claude-sonnet-4", "max_input_tokens": 200000},
                          {"id": "claude-haiku", "max_input_tokens": 200000}]
        }"#;
        let catalog = ModelCatalog::from_json(body).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.limit("gpt-4o").unwrap().max_input_tokens, 128_000);
    }

    #[test]
    fn parses_models_dev_shape() {
        let body = r#"{"zai":{"models":{"glm-5":{"limit":{"context":204800,"output":131072}}}},
                      "empty":{"name":"no models"}}"#;
        let catalog = ModelCatalog::from_json(body).unwrap();
        assert_eq!(catalog.limit("glm-5").unwrap().max_input_tokens, 204_800);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let body = r#"{"p": [
            {"id": "broken", "max_input_tokens": 0},
            {"id": "ok", "max_input_tokens": 10}
        ]}"#;
        let catalog = ModelCatalog::from_json(body).unwrap();
        assert!(catalog.limit("broken").is_none());
        assert!(catalog.limit("ok").is_some());
    }

    #[test]
    fn limits_for_keeps_selection_order_and_skips_unknown() {
        let mut catalog = ModelCatalog::new();
        catalog.insert("p", ModelLimit::new("a", 100));
        catalog.insert("q", ModelLimit::new("b", 1000));
        let limits = catalog.limits_for(&["b", "missing", "a"]);
        assert_eq!(limits, vec![ModelLimit::new("b", 1000), ModelLimit::new("a", 100)]);
    }

    #[test]
    fn non_object_root_is_parse_error() {
        assert!(matches!(
            ModelCatalog::from_json("[1, 2]"),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            ModelCatalog::from_json("not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn static_catalog_returns_snapshot() {
        let mut catalog = ModelCatalog::new();
        catalog.insert("p", ModelLimit::new("a", 100));
        let loaded = StaticCatalog(catalog.clone()).load().await.unwrap();
        assert_eq!(loaded, catalog);
    }
}
