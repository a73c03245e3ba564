//! reqwest-backed tokenizer client (JSON POST).

use async_trait::async_trait;

use super::{TokenCountRequest, TokenCountResponse, TokenizerClient};
use crate::error::EstimationError;

/// Posts `{input_data, model_id}` to `url` and reads `{input_tokens}`.
#[derive(Debug, Clone)]
pub struct HttpTokenizerClient {
    url: String,
    client: reqwest::Client,
}

impl HttpTokenizerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenizerClient for HttpTokenizerClient {
    async fn count_tokens(
        &self,
        request: &TokenCountRequest,
    ) -> Result<TokenCountResponse, EstimationError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| EstimationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EstimationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| EstimationError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| EstimationError::Decode(e.to_string()))
    }
}
