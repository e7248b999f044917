// ── Status / log stream ──
//
// Bounded, append-only feed of user-visible events plus an always-overwritten
// metrics snapshot. Observers are called synchronously, in registration
// order, on every append.

use std::collections::VecDeque;
use std::fmt;

use tokio::sync::watch;

use crate::model::{LogEntry, LogLevel, MetricsSnapshot};

/// Callback invoked with each appended entry.
pub type LogObserver = Box<dyn FnMut(&LogEntry) + Send>;

/// Handle returned by [`StatusStream::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub struct StatusStream {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    observers: Vec<(SubscriptionId, LogObserver)>,
    next_subscription: u64,
    metrics: watch::Sender<MetricsSnapshot>,
}

impl StatusStream {
    /// A stream retaining at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (metrics, _) = watch::channel(MetricsSnapshot::default());
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            observers: Vec::new(),
            next_subscription: 0,
            metrics,
        }
    }

    /// Append an entry, evicting the oldest beyond capacity.
    pub fn append(&mut self, level: LogLevel, message: impl Into<String>) -> LogEntry {
        self.push(LogEntry::new(level, message))
    }

    /// Append a pre-built entry (used when replaying persisted history).
    pub fn push(&mut self, entry: LogEntry) -> LogEntry {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        for (_, observer) in &mut self.observers {
            observer(&entry);
        }
        entry
    }

    /// The `n` most recent entries, newest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: LogObserver) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push((id, observer));
        id
    }

    /// Drop an observer. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ── Metrics ──────────────────────────────────────────────────────

    /// Replace the metrics snapshot wholesale.
    pub fn update_metrics(&mut self, snapshot: MetricsSnapshot) {
        self.metrics.send_replace(snapshot);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.borrow().clone()
    }

    pub fn subscribe_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        self.metrics.subscribe()
    }
}
