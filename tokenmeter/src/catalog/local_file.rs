//! Local file catalog: read a catalog JSON file from disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CatalogError, CatalogSource, ModelCatalog};

/// Loads the catalog from a JSON file in either shape [`ModelCatalog::from_json`] accepts.
#[derive(Debug, Clone)]
pub struct LocalFileCatalog {
    path: PathBuf,
}

impl LocalFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CatalogSource for LocalFileCatalog {
    async fn load(&self) -> Result<ModelCatalog, CatalogError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let catalog = ModelCatalog::from_json(&contents)?;
        tracing::info!(path = %self.path.display(), models = catalog.len(), "model catalog loaded");
        Ok(catalog)
    }
}
