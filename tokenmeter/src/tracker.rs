//! Reactive wiring: keeps the inputs, debounces the draft, drives the estimation client and
//! republishes a [`CapacityReport`] whenever anything relevant changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capacity::{CapacityCalculator, CapacityReport, CurrentInput, UsageThresholds};
use crate::catalog::{ModelCatalog, ModelLimit};
use crate::config::TrackerConfig;
use crate::conversation::{
    aggregate_history, ConversationStore, ConversationStoreError, Conversations, Message,
};
use crate::debounce::{spawn_debounced, DebounceSender};
use crate::estimation::{InputFingerprint, TokenEstimationClient};
use crate::expansion::Attachment;

#[derive(Debug, Default)]
struct Inputs {
    selected: Vec<String>,
    limits: Vec<ModelLimit>,
    conversations: Conversations,
    follow_up: bool,
    draft: String,
    attachments: Vec<Attachment>,
    /// Bumped each time a report is computed, under this lock.
    report_seq: u64,
}

/// Report channel that never replaces a report with one computed earlier.
struct ReportChannel {
    tx: watch::Sender<CapacityReport>,
    sent_seq: AtomicU64,
}

impl ReportChannel {
    fn new() -> Self {
        let (tx, _) = watch::channel(CapacityReport::neutral());
        Self {
            tx,
            sent_seq: AtomicU64::new(0),
        }
    }

    /// Sends `report` unless a report with a higher `seq` was already sent. The check runs
    /// under the channel's write lock.
    fn offer(&self, seq: u64, report: CapacityReport) -> bool {
        self.tx.send_if_modified(|current| {
            if seq <= self.sent_seq.load(Ordering::Relaxed) {
                return false;
            }
            self.sent_seq.store(seq, Ordering::Relaxed);
            *current = report;
            true
        })
    }

    fn subscribe(&self) -> watch::Receiver<CapacityReport> {
        self.tx.subscribe()
    }
}

struct Shared {
    catalog: ModelCatalog,
    client: Arc<TokenEstimationClient>,
    calculator: CapacityCalculator,
    inputs: Mutex<Inputs>,
    debounced: watch::Receiver<String>,
    reports: ReportChannel,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self) -> CapacityReport {
        self.compute(&self.lock())
    }

    fn compute(&self, inputs: &Inputs) -> CapacityReport {
        let history = aggregate_history(inputs.conversations.threads(), &inputs.selected);
        let fingerprint = InputFingerprint::of(
            &inputs.draft,
            &inputs.attachments,
            inputs.selected.first().map(String::as_str),
        );
        let awaiting_debounce = *self.debounced.borrow() != inputs.draft;
        let current = CurrentInput::resolve(
            self.client.accurate().as_ref(),
            fingerprint,
            &inputs.draft,
            self.client.is_pending() || awaiting_debounce,
        );
        self.calculator
            .compute(&inputs.limits, history, current, inputs.follow_up)
    }

    /// Computes and sequences under the inputs lock, so the report left in the channel is
    /// always the one computed last, whatever order the sends arrive in.
    fn publish(&self) {
        let (seq, report) = {
            let mut inputs = self.lock();
            inputs.report_seq += 1;
            (inputs.report_seq, self.compute(&inputs))
        };
        self.reports.offer(seq, report);
    }
}

/// Owns the capacity inputs for one draft and pushes reports to subscribers.
///
/// Must be started inside a tokio runtime; background tasks stop when the tracker is dropped.
pub struct CapacityTracker {
    shared: Arc<Shared>,
    draft_tx: DebounceSender<String>,
    trigger: watch::Sender<u64>,
    thresholds: UsageThresholds,
    tasks: Vec<JoinHandle<()>>,
}

impl CapacityTracker {
    pub fn start(
        catalog: ModelCatalog,
        client: Arc<TokenEstimationClient>,
        config: &TrackerConfig,
    ) -> Self {
        let (draft_tx, debounced, debounce_task) =
            spawn_debounced(String::new(), config.debounce());
        let (trigger, trigger_rx) = watch::channel(0u64);

        let shared = Arc::new(Shared {
            catalog,
            client,
            calculator: CapacityCalculator::new(config.limiting_ratio),
            inputs: Mutex::new(Inputs::default()),
            debounced: debounced.clone(),
            reports: ReportChannel::new(),
        });
        let driver = tokio::spawn(drive(shared.clone(), debounced, trigger_rx));

        Self {
            shared,
            draft_tx,
            trigger,
            thresholds: config.thresholds(),
            tasks: vec![debounce_task, driver],
        }
    }

    /// Current report, computed now.
    pub fn report(&self) -> CapacityReport {
        self.shared.report()
    }

    /// Receiver of every published report.
    pub fn subscribe_reports(&self) -> watch::Receiver<CapacityReport> {
        self.shared.reports.subscribe()
    }

    pub fn thresholds(&self) -> UsageThresholds {
        self.thresholds
    }

    pub fn client(&self) -> &Arc<TokenEstimationClient> {
        &self.shared.client
    }

    /// Selection order matters: the first model's tokenizer is used for accurate counts.
    pub fn set_selected_models(&self, model_ids: Vec<String>) {
        {
            let mut inputs = self.shared.lock();
            inputs.limits = self.shared.catalog.limits_for(&model_ids);
            inputs.selected = model_ids;
        }
        self.retrigger();
    }

    pub fn set_attachments(&self, attachments: Vec<Attachment>) {
        self.shared.lock().attachments = attachments;
        self.retrigger();
    }

    /// Raw draft text. The tokenizer sees it only after the debounce window.
    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.lock().draft = text.clone();
        self.draft_tx.feed(text);
        self.shared.publish();
    }

    pub fn set_follow_up(&self, follow_up: bool) {
        self.shared.lock().follow_up = follow_up;
        self.shared.publish();
    }

    pub fn set_conversations(&self, conversations: Conversations) {
        self.shared.lock().conversations = conversations;
        self.shared.publish();
    }

    /// Replaces the threads with a snapshot from `store`.
    pub async fn sync_conversations(
        &self,
        store: &dyn ConversationStore,
    ) -> Result<(), ConversationStoreError> {
        let conversations = store.threads().await?;
        self.set_conversations(conversations);
        Ok(())
    }

    /// Records a message the server created (with its recorded token count).
    pub fn append_message(&self, model_id: &str, message: Message) {
        self.shared.lock().conversations.append(model_id, message);
        self.shared.publish();
    }

    /// Clears all threads and leaves follow-up mode.
    pub fn start_fresh_comparison(&self) {
        {
            let mut inputs = self.shared.lock();
            inputs.conversations.clear();
            inputs.follow_up = false;
        }
        self.shared.publish();
    }

    fn retrigger(&self) {
        self.trigger.send_modify(|n| *n = n.wrapping_add(1));
        self.shared.publish();
    }
}

impl Drop for CapacityTracker {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        // Detached `run` tasks resolve as superseded once the generation moves on.
        self.shared.client.clear();
    }
}

/// Issues one estimation per settled draft or selection/attachment change.
async fn drive(
    shared: Arc<Shared>,
    mut text_rx: watch::Receiver<String>,
    mut trigger_rx: watch::Receiver<u64>,
) {
    loop {
        tokio::select! {
            changed = text_rx.changed() => if changed.is_err() { break },
            changed = trigger_rx.changed() => if changed.is_err() { break },
        }
        let _ = trigger_rx.borrow_and_update();
        let text = text_rx.borrow_and_update().clone();
        let (attachments, selected) = {
            let inputs = shared.lock();
            (inputs.attachments.clone(), inputs.selected.clone())
        };

        // Issue synchronously so generations follow trigger order; run concurrently so a newer
        // trigger can supersede it.
        if let Some(ticket) = shared.client.issue(&text, &attachments, &selected) {
            let shared = shared.clone();
            tokio::spawn(async move {
                shared.client.run(ticket).await;
                shared.publish();
            });
        }
        shared.publish();
    }
    tracing::debug!("capacity tracker driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(tokens: u64) -> CapacityReport {
        CapacityReport {
            total_tokens: tokens,
            ..CapacityReport::neutral()
        }
    }

    #[test]
    fn later_computed_report_wins_regardless_of_send_order() {
        let channel = ReportChannel::new();
        let rx = channel.subscribe();

        assert!(channel.offer(2, report(20)));
        assert!(!channel.offer(1, report(10)));
        assert_eq!(rx.borrow().total_tokens, 20);

        assert!(channel.offer(3, report(30)));
        assert_eq!(rx.borrow().total_tokens, 30);
    }

    #[test]
    fn repeated_seq_is_dropped() {
        let channel = ReportChannel::new();
        assert!(channel.offer(1, report(1)));
        assert!(!channel.offer(1, report(2)));
        assert_eq!(channel.subscribe().borrow().total_tokens, 1);
    }
}
