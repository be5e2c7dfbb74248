//! Bounded work queue feeding the worker pool.

use crate::event::EventEnvelope;
use crate::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, trace};

/// Receiving end of the queue, shared by every worker.
#[derive(Debug, Clone)]
pub(crate) struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<EventEnvelope>>>,
    pending: Arc<AtomicUsize>,
}

impl QueueReceiver {
    /// Next envelope, or `None` once the queue is closed and drained.
    pub(crate) async fn recv(&self) -> Option<EventEnvelope> {
        // Only one idle worker waits on the channel at a time
        let envelope = self.rx.lock().await.recv().await?;
        self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(envelope)
    }
}

/// A bounded queue of envelopes awaiting asynchronous dispatch.
///
/// `push` waits while the queue is full; nothing is ever dropped. `close`
/// stops new pushes. Items already queued stay receivable, so workers drain
/// them before seeing the end of the stream.
#[derive(Debug)]
pub struct WorkQueue {
    /// Sending end; `None` once closed
    sender: Mutex<Option<mpsc::Sender<EventEnvelope>>>,

    /// Receiving end shared by all workers
    receiver: QueueReceiver,

    /// Items pushed and not yet taken by a worker
    pending: Arc<AtomicUsize>,

    /// Channel capacity
    capacity: usize,
}

impl WorkQueue {
    /// Create a queue holding at most `capacity` items (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, rx) = mpsc::channel(capacity);
        let pending = Arc::new(AtomicUsize::new(0));

        Self {
            sender: Mutex::new(Some(sender)),
            receiver: QueueReceiver {
                rx: Arc::new(Mutex::new(rx)),
                pending: pending.clone(),
            },
            pending,
            capacity,
        }
    }

    /// Enqueue an envelope, waiting for room if the queue is full.
    ///
    /// Fails with [`Error::ShuttingDown`] once the queue is closed.
    pub async fn push(&self, envelope: EventEnvelope) -> Result<()> {
        // Clone the sender so the lock is not held while waiting for capacity
        let sender = self
            .sender
            .lock()
            .await
            .as_ref()
            .cloned()
            .ok_or(Error::ShuttingDown)?;

        let permit = sender.reserve().await.map_err(|_| Error::ShuttingDown)?;

        trace!(
            event_id = %envelope.event_id(),
            event_type = envelope.event_type(),
            "Queueing event"
        );

        // Counted before the send so a worker never decrements first
        self.pending.fetch_add(1, Ordering::AcqRel);
        permit.send(envelope);
        Ok(())
    }

    /// Stop accepting items. Fails with [`Error::AlreadyShutDown`] on a second call.
    pub async fn close(&self) -> Result<()> {
        match self.sender.lock().await.take() {
            Some(_) => {
                info!(queued = self.len(), "Work queue closed");
                Ok(())
            }
            None => Err(Error::AlreadyShutDown),
        }
    }

    /// Whether `close` has been called
    pub async fn is_closed(&self) -> bool {
        self.sender.lock().await.is_none()
    }

    /// Number of items waiting for a worker, including after `close`
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether no item is waiting for a worker
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn receiver(&self) -> QueueReceiver {
        self.receiver.clone()
    }
}
