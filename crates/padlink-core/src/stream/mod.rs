// ── Reactive streams ──
//
// Subscription handles for views: registry snapshots over `watch`, and the
// status feed over `broadcast`.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use crate::model::{Device, EntityId, LogEntry, SoftwareEndpoint};

/// Entities that can be looked up in a snapshot by id.
pub trait Identified {
    fn entity_id(&self) -> &EntityId;
}

impl Identified for Device {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

impl Identified for SoftwareEndpoint {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

/// A subscription to one registry.
///
/// Gives both point-in-time snapshot access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed`).
    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    /// The newest snapshot, which may be ahead of `current`.
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the registry is gone.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

impl<T: Identified + Clone + Send + Sync + 'static> EntityStream<T> {
    /// Look `id` up in the newest snapshot.
    pub fn find(&self, id: &EntityId) -> Option<Arc<T>> {
        self.receiver
            .borrow()
            .iter()
            .find(|e| e.entity_id() == id)
            .cloned()
    }
}

/// `Stream` adapter yielding a fresh snapshot on every registry change.
pub struct EntityWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Arc<Vec<Arc<T>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Arc<Vec<Arc<T>>> is Unpin, so WatchStream is too.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Status entries as they are appended.
///
/// A subscriber that falls behind skips the entries it missed instead of
/// ending; the count is reported through `tracing`.
pub struct LogStream {
    inner: BroadcastStream<LogEntry>,
}

impl LogStream {
    pub(crate) fn new(receiver: broadcast::Receiver<LogEntry>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }
}

impl Stream for LogStream {
    type Item = LogEntry;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(entry))) => return Poll::Ready(Some(entry)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "log subscriber lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
