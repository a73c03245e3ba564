//! Tokenizer RPC: ask a remote service for a model's exact input-token count.

mod http;

pub use http::HttpTokenizerClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// Body of one token-count call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCountRequest {
    pub input_data: String,
    pub model_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCountResponse {
    pub input_tokens: u32,
}

/// Remote tokenizer. Implementations do not retry.
///
/// Dropping the returned future must abort the call where the transport allows it; the
/// estimation client relies on this to cancel superseded requests.
#[async_trait]
pub trait TokenizerClient: Send + Sync {
    async fn count_tokens(
        &self,
        request: &TokenCountRequest,
    ) -> Result<TokenCountResponse, EstimationError>;
}
