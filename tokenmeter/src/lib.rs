//! # Tokenmeter
//!
//! Real-time tracking of how much of a model's input-token budget a draft message plus prior
//! conversation history would use, across several selected models at once.
//!
//! Accurate counts come from a slow remote tokenizer; a local `chars / 4` estimate covers the
//! gap until one arrives. Draft text is debounced before it is sent, superseded requests are
//! cancelled and their late results discarded, and history cost is the maximum (not the sum)
//! of the per-model thread totals.
//!
//! ## Main modules
//!
//! - [`estimate`]: [`fallback_estimate`] — the local approximation.
//! - [`conversation`]: [`ConversationThread`], [`Message`], [`aggregate_history`],
//!   [`ConversationStore`].
//! - [`debounce`]: [`Debouncer`] and [`spawn_debounced`].
//! - [`tokenizer`]: [`TokenizerClient`] trait and [`HttpTokenizerClient`].
//! - [`expansion`]: [`Attachment`], [`FileExpander`], [`LocalFileExpander`].
//! - [`estimation`]: [`TokenEstimationClient`] — cancellable, generation-stamped accurate counts.
//! - [`capacity`]: [`CapacityCalculator`], [`CapacityReport`].
//! - [`catalog`]: [`ModelCatalog`], [`ModelLimit`], catalog sources (models.dev, local file).
//! - [`tracker`]: [`CapacityTracker`] — reactive wiring of all of the above.
//! - [`config`]: [`TrackerConfig`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokenmeter::{
//!     CapacityCalculator, CurrentInput, HttpTokenizerClient, LocalFileExpander, ModelLimit,
//!     TokenEstimationClient,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = TokenEstimationClient::new(
//!     Arc::new(HttpTokenizerClient::new("http://127.0.0.1:8000/api/v1/tokens/estimate")),
//!     Arc::new(LocalFileExpander),
//! );
//! let models = vec!["gpt-4o".to_string()];
//! let current = match client.estimate("Summarize this thread", &[], &models).await {
//!     Some(count) => CurrentInput::accurate(count.input_tokens),
//!     None => CurrentInput::approximate("Summarize this thread"),
//! };
//! let report = CapacityCalculator::default().compute(
//!     &[ModelLimit::new("gpt-4o", 128_000)],
//!     0,
//!     current,
//!     false,
//! );
//! println!("{}", report.summary());
//! # }
//! ```

pub mod capacity;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod debounce;
pub mod error;
pub mod estimate;
pub mod estimation;
pub mod expansion;
pub mod tokenizer;
pub mod tracker;

pub use capacity::{CapacityCalculator, CapacityReport, CurrentInput, UsageLevel, UsageThresholds};
pub use catalog::{
    CatalogError, CatalogSource, LocalFileCatalog, ModelCatalog, ModelLimit, ModelsDevCatalog,
    ReqwestHttpClient,
    StaticCatalog,
};
pub use config::{ConfigLoadError, TrackerConfig};
pub use conversation::{
    aggregate_history, ConversationStore, ConversationStoreError, ConversationThread,
    Conversations, InMemoryConversationStore, Message, Role,
};
pub use debounce::{spawn_debounced, DebounceSender, Debouncer, DEFAULT_DEBOUNCE};
pub use error::EstimationError;
pub use estimate::fallback_estimate;
pub use estimation::{AccurateCount, EstimationTicket, InputFingerprint, TokenEstimationClient};
pub use expansion::{Attachment, FileExpander, LocalFileExpander, PassthroughExpander};
pub use tokenizer::{HttpTokenizerClient, TokenCountRequest, TokenCountResponse, TokenizerClient};
pub use tracker::CapacityTracker;
