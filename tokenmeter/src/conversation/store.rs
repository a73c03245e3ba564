//! Conversation store seam: where per-model threads come from.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Conversations, Message};

/// Error from [`ConversationStore`] operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConversationStoreError {
    #[error("conversation store error: {0}")]
    Other(String),
}

/// Read-side source of per-model threads, plus append for newly created messages.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Snapshot of all threads.
    async fn threads(&self) -> Result<Conversations, ConversationStoreError>;

    /// Appends one server-recorded message to the model's thread.
    async fn append(&self, model_id: &str, message: Message) -> Result<(), ConversationStoreError>;
}

/// Session-lifetime store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<Conversations>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: Conversations) -> Self {
        Self {
            inner: RwLock::new(conversations),
        }
    }

    /// Clears all threads (a fresh comparison).
    pub async fn reset(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn threads(&self) -> Result<Conversations, ConversationStoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn append(&self, model_id: &str, message: Message) -> Result<(), ConversationStoreError> {
        self.inner.write().await.append(model_id, message);
        Ok(())
    }
}
