//! Accurate token counts from the remote tokenizer, with "last request wins" semantics.
//!
//! Every request is stamped with a generation taken from a monotonically increasing counter.
//! A result is committed only if its generation is still the current one at the moment it
//! resolves; issuing a newer request (or clearing) bumps the counter and cancels the older
//! request's [`CancellationToken`], which also drops the in-flight future so the transport can
//! abort it. Arrival order of responses therefore never decides what is displayed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::EstimationError;
use crate::expansion::{Attachment, FileExpander};
use crate::tokenizer::{TokenCountRequest, TokenizerClient};

/// Identifies the exact input a count was obtained for: text, attachments and the model whose
/// tokenizer was asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputFingerprint(u64);

impl InputFingerprint {
    pub fn of(text: &str, attachments: &[Attachment], model_id: Option<&str>) -> Self {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        attachments.hash(&mut hasher);
        model_id.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Most recent committed tokenizer result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccurateCount {
    pub input_tokens: u32,
    /// Generation of the request that produced it.
    pub generation: u64,
    pub fingerprint: InputFingerprint,
}

/// A request that has been issued (generation assigned, predecessor cancelled) but not run.
#[derive(Debug)]
pub struct EstimationTicket {
    generation: u64,
    token: CancellationToken,
    model_id: String,
    text: String,
    attachments: Vec<Attachment>,
    fingerprint: InputFingerprint,
}

impl EstimationTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    token: CancellationToken,
    pending: bool,
}

/// Single-writer owner of the [`AccurateCount`].
pub struct TokenEstimationClient {
    tokenizer: Arc<dyn TokenizerClient>,
    expander: Arc<dyn FileExpander>,
    inflight: Mutex<InFlight>,
    accurate: watch::Sender<Option<AccurateCount>>,
}

impl TokenEstimationClient {
    pub fn new(tokenizer: Arc<dyn TokenizerClient>, expander: Arc<dyn FileExpander>) -> Self {
        let (accurate, _) = watch::channel(None);
        Self {
            tokenizer,
            expander,
            inflight: Mutex::new(InFlight {
                generation: 0,
                token: CancellationToken::new(),
                pending: false,
            }),
            accurate,
        }
    }

    /// Currently committed count, if any.
    pub fn accurate(&self) -> Option<AccurateCount> {
        *self.accurate.borrow()
    }

    /// Notified on every commit or clear.
    pub fn subscribe(&self) -> watch::Receiver<Option<AccurateCount>> {
        self.accurate.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Whether the current generation's request has not resolved yet.
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Invalidates any in-flight request and clears the committed count.
    pub fn clear(&self) {
        let mut inflight = self.lock();
        inflight.generation += 1;
        inflight.token.cancel();
        inflight.pending = false;
        self.accurate.send_replace(None);
    }

    /// Estimates `text` (plus attachments) with the first selected model's tokenizer.
    ///
    /// Returns the committed count, or `None` when the input is empty, no model is selected,
    /// the request failed, or it was superseded before resolving.
    pub async fn estimate(
        &self,
        text: &str,
        attachments: &[Attachment],
        selected_model_ids: &[String],
    ) -> Option<AccurateCount> {
        let ticket = self.issue(text, attachments, selected_model_ids)?;
        self.run(ticket).await
    }

    /// First half of [`estimate`](Self::estimate): assigns the next generation and cancels the
    /// previous request synchronously, so callers that spawn [`run`](Self::run) keep issue order.
    ///
    /// With no model selected, or blank text and no attachments, clears instead and returns `None`.
    pub fn issue(
        &self,
        text: &str,
        attachments: &[Attachment],
        selected_model_ids: &[String],
    ) -> Option<EstimationTicket> {
        let Some(model_id) = selected_model_ids.first() else {
            tracing::debug!("no models selected; clearing accurate count");
            self.clear();
            return None;
        };
        if text.trim().is_empty() && attachments.is_empty() {
            tracing::debug!("empty input; clearing accurate count");
            self.clear();
            return None;
        }

        let token = CancellationToken::new();
        let mut inflight = self.lock();
        inflight.generation += 1;
        inflight.token.cancel();
        inflight.token = token.clone();
        inflight.pending = true;

        Some(EstimationTicket {
            generation: inflight.generation,
            token,
            model_id: model_id.clone(),
            text: text.to_string(),
            attachments: attachments.to_vec(),
            fingerprint: InputFingerprint::of(text, attachments, Some(model_id)),
        })
    }

    /// Second half of [`estimate`](Self::estimate): expands attachments, calls the tokenizer and
    /// commits the result if the ticket is still current.
    pub async fn run(&self, ticket: EstimationTicket) -> Option<AccurateCount> {
        let span = tracing::debug_span!(
            "token_estimate",
            generation = ticket.generation,
            model_id = %ticket.model_id
        );
        self.run_inner(ticket).instrument(span).await
    }

    async fn run_inner(&self, ticket: EstimationTicket) -> Option<AccurateCount> {
        let input_data = if ticket.attachments.is_empty() {
            ticket.text.clone()
        } else {
            tokio::select! {
                biased;
                _ = ticket.token.cancelled() => {
                    tracing::debug!("superseded during attachment expansion");
                    return None;
                }
                expanded = self.expander.expand(&ticket.attachments, &ticket.text) => {
                    match expanded {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                "attachment expansion failed; estimating raw draft"
                            );
                            ticket.text.clone()
                        }
                    }
                }
            }
        };

        let request = TokenCountRequest {
            input_data,
            model_id: ticket.model_id.clone(),
        };
        let result = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(EstimationError::Cancelled),
            response = self.tokenizer.count_tokens(&request) => response,
        };

        self.resolve(&ticket, result.map(|r| r.input_tokens))
    }

    fn resolve(
        &self,
        ticket: &EstimationTicket,
        result: Result<u32, EstimationError>,
    ) -> Option<AccurateCount> {
        let mut inflight = self.lock();
        if inflight.generation != ticket.generation {
            tracing::debug!(
                current = inflight.generation,
                "discarding result of superseded request"
            );
            return None;
        }
        inflight.pending = false;

        match result {
            Ok(input_tokens) => {
                let count = AccurateCount {
                    input_tokens,
                    generation: ticket.generation,
                    fingerprint: ticket.fingerprint,
                };
                self.accurate.send_replace(Some(count));
                tracing::debug!(input_tokens, "accurate count committed");
                Some(count)
            }
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "token estimation failed; falling back to local estimate"
                );
                self.accurate.send_replace(None);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, InFlight> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
