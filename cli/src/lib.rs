//! Library side of the `tokenmeter` binary.
//!
//! [`run_report`] produces a single report for one draft; [`watch::run_watch`] follows a draft
//! typed line by line on stdin. Both load their inputs through [`SessionOptions`].

pub mod output;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokenmeter::{
    aggregate_history, Attachment, CapacityCalculator, CapacityReport, CatalogError,
    CatalogSource, ConversationStore, ConversationStoreError, Conversations, CurrentInput,
    EstimationError, HttpTokenizerClient, InMemoryConversationStore, InputFingerprint,
    LocalFileCatalog, LocalFileExpander, ModelCatalog, ModelLimit, ModelsDevCatalog,
    ReqwestHttpClient, TokenCountRequest, TokenCountResponse, TokenEstimationClient,
    TokenizerClient, TrackerConfig,
};

pub use output::{render, OutputFormat};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("conversations file {path}: {source}")]
    Conversations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("conversation store: {0}")]
    Store(#[from] ConversationStoreError),
    #[error("none of the selected models are in the catalog: {}", .0.join(", "))]
    UnknownModels(Vec<String>),
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Inputs shared by `report` and `watch`.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Selected models in selection order.
    pub models: Vec<String>,
    pub attachments: Vec<PathBuf>,
    /// JSON file with the per-model conversation threads.
    pub conversations: Option<PathBuf>,
    pub follow_up: bool,
    /// Local catalog file; overrides the configured catalog.
    pub catalog: Option<PathBuf>,
    pub tokenizer_url: Option<String>,
    /// Never call the tokenizer; counts stay approximate.
    pub offline: bool,
}

impl SessionOptions {
    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.iter().map(Attachment::from_path).collect()
    }

    /// `--catalog`, then `catalog_path` from config, then `catalog_url`.
    pub async fn load_catalog(&self, config: &TrackerConfig) -> Result<ModelCatalog, CliError> {
        let source: Box<dyn CatalogSource> =
            match self.catalog.as_ref().or(config.catalog_path.as_ref()) {
                Some(path) => Box::new(LocalFileCatalog::new(path)),
                None => Box::new(ModelsDevCatalog::with_client(
                    config.catalog_url.clone(),
                    Arc::new(ReqwestHttpClient::default()),
                )),
            };
        Ok(source.load().await?)
    }

    /// Session store seeded from `--conversations`; empty without it.
    pub fn load_conversations(&self) -> Result<InMemoryConversationStore, CliError> {
        let Some(path) = &self.conversations else {
            return Ok(InMemoryConversationStore::new());
        };
        let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        let conversations =
            Conversations::from_json(&json).map_err(|source| CliError::Conversations {
                path: path.clone(),
                source,
            })?;
        Ok(InMemoryConversationStore::with_conversations(conversations))
    }

    pub fn build_client(&self, config: &TrackerConfig) -> Arc<TokenEstimationClient> {
        let tokenizer: Arc<dyn TokenizerClient> = if self.offline {
            Arc::new(OfflineTokenizer)
        } else {
            let url = self.tokenizer_url.as_deref().unwrap_or(&config.tokenizer_url);
            Arc::new(HttpTokenizerClient::new(url))
        };
        Arc::new(TokenEstimationClient::new(tokenizer, Arc::new(LocalFileExpander)))
    }
}

/// Tokenizer used with `--offline`: every request fails, so reports stay on the fallback count.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTokenizer;

#[async_trait]
impl TokenizerClient for OfflineTokenizer {
    async fn count_tokens(
        &self,
        _request: &TokenCountRequest,
    ) -> Result<TokenCountResponse, EstimationError> {
        Err(EstimationError::Network("offline".to_string()))
    }
}

/// Limits for the selected models. Unknown ids are skipped with a warning; an error only when
/// models were selected and none of them are known.
pub fn resolve_limits(
    catalog: &ModelCatalog,
    models: &[String],
) -> Result<Vec<ModelLimit>, CliError> {
    let limits = catalog.limits_for(models);
    if !models.is_empty() && limits.is_empty() {
        return Err(CliError::UnknownModels(models.to_vec()));
    }
    for id in models.iter().filter(|id| catalog.limit(id).is_none()) {
        tracing::warn!(model_id = %id, "model not in catalog, ignored");
    }
    Ok(limits)
}

/// One report for `text`, with a single tokenizer round trip unless `offline` is set.
pub async fn run_report(
    options: &SessionOptions,
    config: &TrackerConfig,
    text: &str,
) -> Result<CapacityReport, CliError> {
    let catalog = options.load_catalog(config).await?;
    let limits = resolve_limits(&catalog, &options.models)?;
    let conversations = options.load_conversations()?.threads().await?;
    let attachments = options.attachments();

    let current = if options.offline || options.models.is_empty() {
        CurrentInput::approximate(text)
    } else {
        let client = options.build_client(config);
        let count = client.estimate(text, &attachments, &options.models).await;
        let representative = options.models.first().map(String::as_str);
        let fingerprint = InputFingerprint::of(text, &attachments, representative);
        CurrentInput::resolve(count.as_ref(), fingerprint, text, false)
    };

    let history = aggregate_history(conversations.threads(), &options.models);
    let report = CapacityCalculator::new(config.limiting_ratio).compute(
        &limits,
        history,
        current,
        options.follow_up,
    );
    tracing::debug!(
        total = report.total_tokens,
        min_limit = report.min_limit,
        "report computed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn catalog_file() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        let json = r#"{"acme":[
            {"id":"small","max_input_tokens":100},
            {"id":"large","max_input_tokens":1000}
        ]}"#;
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    fn options(catalog: &NamedTempFile, models: &[&str]) -> SessionOptions {
        SessionOptions {
            models: models.iter().map(|m| m.to_string()).collect(),
            catalog: Some(catalog.path().to_path_buf()),
            offline: true,
            ..Default::default()
        }
    }

    #[test]
    fn resolve_limits_skips_unknown() {
        let mut catalog = ModelCatalog::new();
        catalog.insert("acme", ModelLimit::new("a", 10));
        let limits = resolve_limits(&catalog, &["ghost".to_string(), "a".to_string()]).unwrap();
        assert_eq!(limits, vec![ModelLimit::new("a", 10)]);
    }

    #[test]
    fn resolve_limits_errors_when_nothing_known() {
        let catalog = ModelCatalog::new();
        let err = resolve_limits(&catalog, &["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, CliError::UnknownModels(ref ids) if ids == &["ghost"]));
        assert!(resolve_limits(&catalog, &[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_report_uses_fallback() {
        let catalog = catalog_file();
        let opts = options(&catalog, &["small", "large"]);
        // 40 chars -> 10 tokens
        let text = "x".repeat(40);
        let report = run_report(&opts, &TrackerConfig::default(), &text).await.unwrap();
        assert_eq!(report.current_input_tokens, 10);
        assert!(!report.is_accurate);
        assert_eq!(report.min_limit, 100);
        assert_eq!(report.limiting_model_id.as_deref(), Some("small"));
        assert_eq!(report.percent_used, 10.0);
    }

    #[tokio::test]
    async fn follow_up_counts_history() {
        let catalog = catalog_file();
        let mut conversations = NamedTempFile::new().unwrap();
        let json = r#"[{"model_id":"small","messages":[
            {"role":"user","recorded_tokens":30},
            {"role":"assistant","recorded_tokens":20}
        ]}]"#;
        conversations.write_all(json.as_bytes()).unwrap();
        let mut opts = options(&catalog, &["small"]);
        opts.conversations = Some(conversations.path().to_path_buf());

        let report = run_report(&opts, &TrackerConfig::default(), "abcd").await.unwrap();
        assert_eq!(report.history_tokens, 0);

        opts.follow_up = true;
        let report = run_report(&opts, &TrackerConfig::default(), "abcd").await.unwrap();
        assert_eq!(report.history_tokens, 50);
        assert_eq!(report.total_tokens, 51);
    }

    #[tokio::test]
    async fn missing_conversations_file_is_an_error() {
        let catalog = catalog_file();
        let mut opts = options(&catalog, &["small"]);
        opts.conversations = Some(PathBuf::from("/nonexistent/conversations.json"));
        let err = run_report(&opts, &TrackerConfig::default(), "hi").await.unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
