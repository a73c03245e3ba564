//! Debounce: hold back a rapidly changing value until it has been quiet for a window.
//!
//! [`Debouncer`] is the clock-explicit state machine; [`spawn_debounced`] drives one on a tokio
//! task and publishes settled values to a `watch` channel. A newer value supersedes a pending
//! one (it is not queued behind it).

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Window used for draft text before asking the tokenizer.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Settled value plus at most one pending value with its deadline.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    current: T,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(initial: T, window: Duration) -> Self {
        Self {
            window,
            current: initial,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replaces any pending value; the window restarts at `now`.
    pub fn feed_at(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    /// Promotes the pending value if its window has elapsed by `now`. Returns whether it did.
    pub fn settle_at(&mut self, now: Instant) -> bool {
        match self.pending.take() {
            Some((value, deadline)) if deadline <= now => {
                self.current = value;
                true
            }
            other => {
                self.pending = other;
                false
            }
        }
    }

    pub fn feed(&mut self, value: T) {
        self.feed_at(value, Instant::now());
    }

    pub fn settle(&mut self) -> bool {
        self.settle_at(Instant::now())
    }

    /// Last settled value.
    pub fn current_value(&self) -> &T {
        &self.current
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(v, _)| v)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, d)| *d)
    }
}

/// Input side of a spawned debouncer.
#[derive(Debug)]
pub struct DebounceSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DebounceSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DebounceSender<T> {
    /// Feeds a new raw value. Returns false once the driver task has stopped.
    pub fn feed(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Spawns a task that debounces fed values and publishes settled ones.
///
/// The task ends when every [`DebounceSender`] is dropped (after flushing a pending value) or
/// when every receiver is dropped.
pub fn spawn_debounced<T>(
    initial: T,
    window: Duration,
) -> (DebounceSender<T>, watch::Receiver<T>, JoinHandle<()>)
where
    T: Clone + Send + Sync + 'static,
{
    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<T>();
    let (out_tx, out_rx) = watch::channel(initial.clone());

    let handle = tokio::spawn(async move {
        let mut debouncer = Debouncer::new(initial, window);
        let mut open = true;
        while open || debouncer.deadline().is_some() {
            let deadline = debouncer.deadline();
            let wake = deadline.unwrap_or_else(|| Instant::now() + window);
            let sleep = tokio::time::sleep_until(wake);
            tokio::select! {
                msg = in_rx.recv(), if open => match msg {
                    Some(value) => debouncer.feed(value),
                    None => open = false,
                },
                _ = sleep, if deadline.is_some() => {
                    if debouncer.settle()
                        && out_tx.send(debouncer.current_value().clone()).is_err()
                    {
                        break;
                    }
                }
            }
        }
    });

    (DebounceSender { tx: in_tx }, out_rx, handle)
}
