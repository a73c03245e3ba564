//! Per-model conversation threads and history aggregation.
//!
//! Each selected model has its own independent thread. Messages carry the token count the
//! server recorded when they were created; this module never recomputes or estimates it.

mod store;

pub use store::{ConversationStore, ConversationStoreError, InMemoryConversationStore};

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a thread. Only the recorded token count matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Server-assigned count; `None` for messages created before counts were recorded.
    #[serde(default, alias = "recordedTokens")]
    pub recorded_tokens: Option<u32>,
}

impl Message {
    pub fn user(recorded_tokens: Option<u32>) -> Self {
        Self {
            role: Role::User,
            recorded_tokens,
        }
    }

    pub fn assistant(recorded_tokens: Option<u32>) -> Self {
        Self {
            role: Role::Assistant,
            recorded_tokens,
        }
    }
}

/// Ordered message history for one model. Append-only during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationThread {
    #[serde(alias = "modelId")]
    pub model_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationThread {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Sum of recorded counts; unrecorded messages add nothing.
    pub fn recorded_total(&self) -> u64 {
        self.messages
            .iter()
            .filter_map(|m| m.recorded_tokens)
            .map(u64::from)
            .sum()
    }
}

/// All threads of the current comparison, keyed by model id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversations {
    threads: BTreeMap<String, ConversationThread>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread for `model_id`, created empty on first use.
    pub fn thread_mut(&mut self, model_id: &str) -> &mut ConversationThread {
        self.threads
            .entry(model_id.to_string())
            .or_insert_with(|| ConversationThread::new(model_id))
    }

    pub fn append(&mut self, model_id: &str, message: Message) {
        self.thread_mut(model_id).push(message);
    }

    pub fn get(&self, model_id: &str) -> Option<&ConversationThread> {
        self.threads.get(model_id)
    }

    pub fn threads(&self) -> impl Iterator<Item = &ConversationThread> {
        self.threads.values()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.values().all(|t| t.messages.is_empty())
    }

    /// Drops every thread; a new (non-follow-up) comparison starts from nothing.
    pub fn clear(&mut self) {
        self.threads.clear();
    }

    /// Parses a JSON array of threads. Threads for the same model are concatenated in order.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let threads: Vec<ConversationThread> = serde_json::from_str(json)?;
        Ok(threads.into_iter().collect())
    }
}

impl FromIterator<ConversationThread> for Conversations {
    fn from_iter<I: IntoIterator<Item = ConversationThread>>(iter: I) -> Self {
        let mut out = Self::new();
        for thread in iter {
            out.thread_mut(&thread.model_id).messages.extend(thread.messages);
        }
        out
    }
}

/// History cost shared by all selected models: the largest per-model recorded sum.
///
/// Threads for unselected models, and empty threads, are ignored. The maximum (not the sum)
/// is used because the cost is compared against the tightest model limit. Order of
/// `threads` does not matter.
pub fn aggregate_history<'a, I, S>(threads: I, selected_model_ids: &[S]) -> u64
where
    I: IntoIterator<Item = &'a ConversationThread>,
    S: AsRef<str>,
{
    let selected: HashSet<&str> = selected_model_ids.iter().map(AsRef::as_ref).collect();
    threads
        .into_iter()
        .filter(|t| !t.messages.is_empty() && selected.contains(t.model_id.as_str()))
        .map(ConversationThread::recorded_total)
        .max()
        .unwrap_or(0)
}
