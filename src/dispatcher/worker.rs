//! Worker pool for processing queued events in parallel.

use super::channel::QueueReceiver;
use crate::bus::EventBus;
use crate::{Error, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of workers
    pub num_workers: usize,

    /// Worker name prefix
    pub name_prefix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            name_prefix: "event-worker".to_string(),
        }
    }
}

/// A fixed-size pool of workers sharing one queue.
///
/// Every worker loops: take the next envelope, dispatch it, repeat, until the
/// queue is closed and drained. A handler error or panic is logged and
/// counted; the worker carries on, so the pool never shrinks.
#[derive(Debug)]
pub struct WorkerPool {
    /// Worker configuration
    config: WorkerConfig,

    /// Worker task handles
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Workers whose loop has not exited yet
    alive: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create a new worker pool; no worker runs until [`start`](Self::start)
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            handles: Mutex::new(Vec::new()),
            alive: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn the workers. Each one dispatches on `bus`.
    pub(crate) async fn start(&self, receiver: QueueReceiver, bus: EventBus) -> Result<()> {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() {
            return Err(Error::internal("Worker pool already started"));
        }

        info!(workers = self.config.num_workers, "Starting worker pool");

        for i in 0..self.config.num_workers {
            let worker_name = format!("{}-{}", self.config.name_prefix, i);
            self.alive.fetch_add(1, Ordering::AcqRel);

            handles.push(tokio::spawn(Self::run(
                worker_name,
                receiver.clone(),
                bus.clone(),
                self.alive.clone(),
            )));
        }

        Ok(())
    }

    async fn run(
        worker_name: String,
        receiver: QueueReceiver,
        bus: EventBus,
        alive: Arc<AtomicUsize>,
    ) {
        debug!(worker = %worker_name, "Worker started");

        loop {
            let Some(envelope) = receiver.recv().await else {
                break;
            };

            trace!(
                worker = %worker_name,
                event_id = %envelope.event_id(),
                event_type = envelope.event_type(),
                "Processing event from queue"
            );

            let dispatcher = bus.dispatcher();
            let outcome = AssertUnwindSafe(dispatcher.dispatch(&bus, &envelope))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(invoked)) => {
                    trace!(
                        worker = %worker_name,
                        event_id = %envelope.event_id(),
                        invoked,
                        "Event dispatched"
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        worker = %worker_name,
                        event_id = %envelope.event_id(),
                        event_type = envelope.event_type(),
                        error = %e,
                        "Handler failed"
                    );
                }
                Err(panic) => {
                    dispatcher.counters().record_error();
                    error!(
                        worker = %worker_name,
                        event_id = %envelope.event_id(),
                        event_type = envelope.event_type(),
                        panic = panic_message(&*panic),
                        "Handler panicked"
                    );
                }
            }
        }

        alive.fetch_sub(1, Ordering::AcqRel);
        debug!(worker = %worker_name, "Worker stopped");
    }

    /// Number of workers the pool was configured with
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Number of workers still running their loop
    pub fn alive(&self) -> usize {
        self.alive.load(Ordering::Acquire)
    }

    /// Wait for every worker to exit, up to `timeout`.
    ///
    /// Workers only exit once the queue is closed, so call this after closing it.
    pub async fn join(&self, timeout: Duration) -> Result<()> {
        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();

        let joined = tokio::time::timeout(timeout, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("Worker task failed: {}", e);
                }
            }
        })
        .await;

        match joined {
            Ok(()) => {
                info!("Worker pool stopped");
                Ok(())
            }
            Err(_) => Err(Error::internal("Worker shutdown timeout")),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Handler;
    use std::sync::atomic::AtomicU64;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_drains_queue() {
        let bus = EventBus::builder()
            .pool_size(3)
            .cache_size(8)
            .build()
            .await
            .unwrap();
        assert_eq!(bus.stats().dispatcher.workers, 3);

        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();
        bus.subscribe(Handler::from_fn(move |_bus: EventBus, n: u64| {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
                Ok(())
            }
        }));

        for i in 1..=10u64 {
            bus.fire_anonymous(i).await.unwrap();
        }

        bus.shutdown_and_wait().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 55);
    }

    #[tokio::test]
    async fn test_worker_survives_handler_faults() {
        let bus = EventBus::builder().build().await.unwrap();
        let handled = Arc::new(AtomicU64::new(0));

        bus.subscribe(Handler::from_fn(|_bus: EventBus, n: u32| async move {
            match n {
                0 => Err(Error::handler("zero")),
                1 => panic!("one"),
                _ => Ok(()),
            }
        }));
        let handled_clone = handled.clone();
        bus.subscribe(Handler::from_fn(move |_bus: EventBus, _n: u32| {
            let handled = handled_clone.clone();
            async move {
                handled.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        for n in [0u32, 1, 2, 3] {
            bus.fire_anonymous(n).await.unwrap();
        }

        bus.shutdown_and_wait().await.unwrap();

        // the failing handler runs first and stops dispatch for 0 and 1
        assert_eq!(handled.load(Ordering::SeqCst), 2);
        assert_eq!(bus.stats().dispatcher.dispatch_errors, 2);
        assert_eq!(bus.stats().dispatcher.events_dispatched, 4);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}
