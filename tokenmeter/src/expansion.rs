//! Attachment expansion: turn attachment references into literal text before tokenizing.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// A file attached to the draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name; also the placeholder key `[[file:<name>]]`.
    pub name: String,
    pub path: PathBuf,
}

impl Attachment {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Uses the file name of `path` as the attachment name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn placeholder(&self) -> String {
        format!("[[file:{}]]", self.name)
    }
}

/// Materializes attachments into the draft text.
#[async_trait]
pub trait FileExpander: Send + Sync {
    async fn expand(
        &self,
        attachments: &[Attachment],
        draft: &str,
    ) -> Result<String, EstimationError>;
}

/// Returns the draft as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughExpander;

#[async_trait]
impl FileExpander for PassthroughExpander {
    async fn expand(
        &self,
        _attachments: &[Attachment],
        draft: &str,
    ) -> Result<String, EstimationError> {
        Ok(draft.to_string())
    }
}

/// Reads attachments from the local filesystem.
///
/// A `[[file:<name>]]` placeholder in the draft is replaced by the content; attachments without
/// a placeholder are appended after the draft.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileExpander;

#[async_trait]
impl FileExpander for LocalFileExpander {
    async fn expand(
        &self,
        attachments: &[Attachment],
        draft: &str,
    ) -> Result<String, EstimationError> {
        let mut text = draft.to_string();
        for attachment in attachments {
            let content = tokio::fs::read_to_string(&attachment.path)
                .await
                .map_err(|e| {
                    EstimationError::Expansion(format!("{}: {e}", attachment.path.display()))
                })?;
            let placeholder = attachment.placeholder();
            if text.contains(&placeholder) {
                text = text.replace(&placeholder, &content);
            } else {
                text.push_str("\n\n");
                text.push_str(&attachment.name);
                text.push_str(":\n");
                text.push_str(&content);
            }
        }
        Ok(text)
    }
}
