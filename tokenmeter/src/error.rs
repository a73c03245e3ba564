//! Error types for token estimation.

use thiserror::Error;

/// Why one token-estimation attempt did not produce an accurate count.
///
/// None of these escape
/// [`TokenEstimationClient::estimate`](crate::TokenEstimationClient::estimate);
/// they are logged and turned into the cleared state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EstimationError {
    /// Superseded by a newer request. Expected; never surfaced.
    #[error("token estimation cancelled")]
    Cancelled,
    /// Transport failure reaching the tokenizer.
    #[error("tokenizer request failed: {0}")]
    Network(String),
    /// Tokenizer answered with a non-2xx status.
    #[error("tokenizer returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Tokenizer body could not be decoded.
    #[error("tokenizer response decode error: {0}")]
    Decode(String),
    /// Attachment content could not be materialized.
    #[error("attachment expansion failed: {0}")]
    Expansion(String),
}

impl EstimationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
