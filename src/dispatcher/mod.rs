//! Event dispatch.
//!
//! [`Dispatcher`] is the synchronous path: it takes a registry snapshot and
//! awaits each matching handler in subscription order. The asynchronous path
//! is a bounded [`WorkQueue`] drained by a [`WorkerPool`] whose workers call
//! the same dispatcher for every item.

use crate::bus::EventBus;
use crate::event::{EventEnvelope, Source};
use crate::registry::HandlerRegistry;
use crate::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

pub mod channel;
pub mod worker;

pub use channel::WorkQueue;
pub use worker::{WorkerConfig, WorkerPool};

/// Statistics for the event dispatcher
#[derive(Debug, Clone, Default)]
pub struct DispatcherStats {
    /// Total events dispatched, through either path
    pub events_dispatched: u64,

    /// Number of dispatches that ended in a handler error or panic
    pub dispatch_errors: u64,

    /// Total handler calls
    pub handler_invocations: u64,

    /// Events currently waiting in the queue
    pub queued: usize,

    /// Number of workers in the pool
    pub workers: usize,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    events_dispatched: AtomicU64,
    dispatch_errors: AtomicU64,
    handler_invocations: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn record_error(&self) {
        self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Invokes the handlers that match an event.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<dyn HandlerRegistry>,
    counters: Arc<DispatchCounters>,
}

impl Dispatcher {
    /// Create a dispatcher reading from `registry`
    pub fn new(registry: Arc<dyn HandlerRegistry>) -> Self {
        Self {
            registry,
            counters: Arc::new(DispatchCounters::default()),
        }
    }

    /// Dispatch an event to every matching binding, in subscription order.
    ///
    /// The registry is snapshotted first; bindings subscribed while this call
    /// runs are not invoked for this event. A missing source resolves to
    /// `bus`. The first handler error stops the dispatch and is returned;
    /// handlers after it are not called.
    ///
    /// Returns the number of handlers invoked.
    pub async fn dispatch(&self, bus: &EventBus, envelope: &EventEnvelope) -> Result<usize> {
        let event_type = envelope.type_tag();
        let bindings = self.registry.snapshot(&event_type);

        trace!(
            event_id = %envelope.event_id(),
            event_type = %event_type,
            bindings = bindings.len(),
            "Dispatching event"
        );

        self.counters.events_dispatched.fetch_add(1, Ordering::Relaxed);

        let source = envelope
            .source()
            .cloned()
            .unwrap_or_else(|| Source::from(bus));

        let mut invoked = 0;
        for binding in bindings.iter().filter(|b| b.accepts(&event_type)) {
            trace!(binding_id = %binding.id(), handler = binding.name(), "Executing handler");

            self.counters.handler_invocations.fetch_add(1, Ordering::Relaxed);
            invoked += 1;

            if let Err(e) = binding.invoke(bus, &source, envelope).await {
                self.counters.record_error();
                debug!(
                    event_id = %envelope.event_id(),
                    binding_id = %binding.id(),
                    error = %e,
                    "Handler failed"
                );
                return Err(e);
            }
        }

        Ok(invoked)
    }

    pub(crate) fn counters(&self) -> &DispatchCounters {
        &self.counters
    }

    /// Counters accumulated so far; queue and pool fields are left at zero
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            events_dispatched: self.counters.events_dispatched.load(Ordering::Relaxed),
            dispatch_errors: self.counters.dispatch_errors.load(Ordering::Relaxed),
            handler_invocations: self.counters.handler_invocations.load(Ordering::Relaxed),
            ..DispatcherStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Origin;
    use crate::subscription::Handler;
    use crate::Error;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_dispatch_in_order_and_isolated_by_type() {
        let bus = EventBus::builder().build().await.unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let log = log.clone();
            assert!(bus.subscribe(Handler::from_fn(move |_bus: EventBus, e: String| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{}:{}", tag, e));
                    Ok(())
                }
            })));
        }
        let ints = log.clone();
        assert!(bus.subscribe(Handler::from_fn(move |_bus: EventBus, n: i32| {
            let ints = ints.clone();
            async move {
                ints.lock().unwrap().push(format!("int:{}", n));
                Ok(())
            }
        })));

        let dispatcher = bus.dispatcher();
        let envelope = EventEnvelope::new("x".to_string(), None, Origin::Send);
        assert_eq!(dispatcher.dispatch(&bus, &envelope).await.unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), ["first:x", "second:x"]);

        let envelope = EventEnvelope::new(7u64, None, Origin::Send);
        assert_eq!(dispatcher.dispatch(&bus, &envelope).await.unwrap(), 0);

        let stats = dispatcher.stats();
        assert_eq!(stats.events_dispatched, 2);
        assert_eq!(stats.handler_invocations, 2);

        bus.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_error_stops_dispatch() {
        let bus = EventBus::builder().build().await.unwrap();
        let reached = Arc::new(Mutex::new(false));

        bus.subscribe(Handler::from_fn(|_bus: EventBus, _e: String| async {
            Err(Error::handler("boom"))
        }));
        let flag = reached.clone();
        bus.subscribe(Handler::from_fn(move |_bus: EventBus, _e: String| {
            let flag = flag.clone();
            async move {
                *flag.lock().unwrap() = true;
                Ok(())
            }
        }));

        let envelope = EventEnvelope::new("x".to_string(), None, Origin::Send);
        let err = bus.dispatcher().dispatch(&bus, &envelope).await.unwrap_err();

        assert!(matches!(err, Error::HandlerError(ref msg) if msg == "boom"));
        assert!(!*reached.lock().unwrap());
        assert_eq!(bus.dispatcher().stats().dispatch_errors, 1);

        bus.shutdown().await.unwrap();
    }
}
