//! Mock tokenizer and expander implementations shared by integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokenmeter::{
    Attachment, EstimationError, FileExpander, PassthroughExpander, TokenCountRequest,
    TokenCountResponse, TokenEstimationClient, TokenizerClient,
};

pub fn models(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Tokenizer whose calls block until the test releases them, one gate per call in order.
pub struct GatedTokenizer {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<u32, EstimationError>>>>,
    seen: mpsc::UnboundedSender<TokenCountRequest>,
}

impl GatedTokenizer {
    /// Returns the tokenizer, one release handle per expected call, and a receiver of
    /// requests as they arrive.
    pub fn new(
        calls: usize,
    ) -> (
        Arc<Self>,
        Vec<oneshot::Sender<Result<u32, EstimationError>>>,
        mpsc::UnboundedReceiver<TokenCountRequest>,
    ) {
        let mut senders = Vec::new();
        let mut gates = VecDeque::new();
        for _ in 0..calls {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            gates.push_back(rx);
        }
        let (seen, seen_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                gates: Mutex::new(gates),
                seen,
            }),
            senders,
            seen_rx,
        )
    }
}

#[async_trait]
impl TokenizerClient for GatedTokenizer {
    async fn count_tokens(
        &self,
        request: &TokenCountRequest,
    ) -> Result<TokenCountResponse, EstimationError> {
        let gate = self.gates.lock().unwrap().pop_front().expect("unexpected tokenizer call");
        let _ = self.seen.send(request.clone());
        let input_tokens = gate
            .await
            .map_err(|_| EstimationError::Network("gate dropped".into()))??;
        Ok(TokenCountResponse { input_tokens })
    }
}

/// Answers immediately with a per-model count and records every request.
#[derive(Default)]
pub struct RecordingTokenizer {
    per_model: HashMap<String, Result<u32, EstimationError>>,
    requests: Mutex<Vec<TokenCountRequest>>,
}

impl RecordingTokenizer {
    pub fn new(per_model: &[(&str, Result<u32, EstimationError>)]) -> Arc<Self> {
        Arc::new(Self {
            per_model: per_model
                .iter()
                .map(|(m, r)| (m.to_string(), r.clone()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TokenCountRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenizerClient for RecordingTokenizer {
    async fn count_tokens(
        &self,
        request: &TokenCountRequest,
    ) -> Result<TokenCountResponse, EstimationError> {
        self.requests.lock().unwrap().push(request.clone());
        let result = self
            .per_model
            .get(&request.model_id)
            .cloned()
            .unwrap_or_else(|| {
                Err(EstimationError::Status {
                    status: 404,
                    body: request.model_id.clone(),
                })
            });
        result.map(|input_tokens| TokenCountResponse { input_tokens })
    }
}

/// Expander that blocks until released, then appends a fixed suffix.
pub struct GatedExpander {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    entered: mpsc::UnboundedSender<()>,
}

impl GatedExpander {
    pub fn new() -> (Arc<Self>, oneshot::Sender<()>, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = oneshot::channel();
        let (entered, entered_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                gate: Mutex::new(Some(rx)),
                entered,
            }),
            tx,
            entered_rx,
        )
    }
}

#[async_trait]
impl FileExpander for GatedExpander {
    async fn expand(
        &self,
        _attachments: &[Attachment],
        draft: &str,
    ) -> Result<String, EstimationError> {
        let gate = self.gate.lock().unwrap().take();
        let _ = self.entered.send(());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(format!("{draft} <expanded>"))
    }
}

/// Expander that always fails.
pub struct FailingExpander;

#[async_trait]
impl FileExpander for FailingExpander {
    async fn expand(
        &self,
        _attachments: &[Attachment],
        _draft: &str,
    ) -> Result<String, EstimationError> {
        Err(EstimationError::Expansion("storage offline".into()))
    }
}

pub fn client_with(tokenizer: Arc<dyn TokenizerClient>) -> Arc<TokenEstimationClient> {
    Arc::new(TokenEstimationClient::new(tokenizer, Arc::new(PassthroughExpander)))
}
