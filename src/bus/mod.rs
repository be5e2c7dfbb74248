//! The main EventBus implementation.
//!
//! The EventBus is the primary interface for publishing and subscribing to events.
//! It composes the registry, the dispatcher, the work queue with its worker
//! pool, and the scheduler.

use crate::dispatcher::{Dispatcher, DispatcherStats, WorkQueue, WorkerPool};
use crate::event::{Event, EventEnvelope, Origin, Source};
use crate::registry::HandlerRegistry;
use crate::scheduler::Scheduler;
use crate::subscription::Handler;
use crate::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

pub mod builder;
pub mod config;

pub use builder::EventBusBuilder;
pub use config::EventBusConfig;

pub(crate) struct Inner {
    pub(crate) id: Uuid,
    pub(crate) config: EventBusConfig,
    pub(crate) registry: Arc<dyn HandlerRegistry>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) queue: WorkQueue,
    pub(crate) pool: WorkerPool,
    pub(crate) scheduler: Scheduler,
    pub(crate) is_shutting_down: AtomicBool,
}

/// The event bus for publishing and subscribing to events.
///
/// Cloning is cheap and every clone refers to the same bus. Handlers receive
/// a clone as their first argument, so they can publish further events.
///
/// Workers keep the bus alive until it is shut down: call
/// [`shutdown`](Self::shutdown) (or [`shutdown_and_wait`](Self::shutdown_and_wait))
/// once you are done with it.
///
/// # Example
///
/// ```rust
/// use tokio_event_bus::{EventBus, Handler, Source};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let bus = EventBus::builder().cache_size(16).pool_size(2).build().await?;
///
///     bus.subscribe(Handler::from_fn(|_bus: EventBus, msg: String| async move {
///         println!("received {msg}");
///         Ok(())
///     }));
///
///     bus.subscribe(Handler::from_sourced_fn(
///         |bus: EventBus, source: Source, msg: String| async move {
///             println!("{msg} from self: {}", source.is_bus(&bus));
///             Ok(())
///         },
///     ));
///
///     // Inline: both handlers have run when this returns
///     bus.send_anonymous("hello".to_string()).await?;
///
///     // Queued: a worker picks it up
///     bus.fire_anonymous("world".to_string()).await?;
///
///     bus.shutdown_and_wait().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<Inner>,
}

impl EventBus {
    /// Create a new EventBus builder
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Unique identity of this bus
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// This bus as an event source
    pub fn as_source(&self) -> Source {
        Source::from(self)
    }

    /// Configuration the bus was built with
    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    /// Register a handler. Returns `false` if its signature is rejected.
    ///
    /// A handler must take two parameters `(bus, event)` or three
    /// `(bus, source, event)`, the first one being the bus. Subscribing the
    /// same handler twice yields two bindings, and both are invoked.
    pub fn subscribe(&self, handler: Handler) -> bool {
        self.try_subscribe(handler).is_ok()
    }

    /// Register a handler, returning its binding id or the reason it was rejected.
    pub fn try_subscribe(&self, handler: Handler) -> Result<Uuid> {
        let name = handler.name().to_string();

        match handler.bind() {
            Ok(binding) => {
                let id = binding.id();
                debug!(
                    bus_id = %self.id(),
                    binding_id = %id,
                    handler = %name,
                    event_type = %binding.event_type(),
                    arity = ?binding.arity(),
                    "Subscribing handler"
                );
                self.inner.registry.register(binding);
                Ok(id)
            }
            Err(rejection) => {
                warn!(
                    bus_id = %self.id(),
                    handler = %name,
                    reason = %rejection,
                    "Handler rejected"
                );
                Err(rejection.into())
            }
        }
    }

    /// Queue an event for asynchronous dispatch.
    ///
    /// Waits while the queue is full. A `None` source means the bus itself.
    /// Fails with [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub async fn fire<E: Event>(&self, source: Option<Source>, event: E) -> Result<()> {
        self.enqueue(EventEnvelope::new(event, source, Origin::Fire)).await
    }

    /// Queue an event whose source is the bus itself
    pub async fn fire_anonymous<E: Event>(&self, event: E) -> Result<()> {
        self.fire(None, event).await
    }

    /// Dispatch an event inline, awaiting every matching handler in
    /// subscription order.
    ///
    /// The first handler error is returned and the remaining handlers are
    /// skipped. Works after shutdown, since it does not use the queue.
    pub async fn send<E: Event>(&self, source: Option<Source>, event: E) -> Result<()> {
        let envelope = EventEnvelope::new(event, source, Origin::Send);

        trace!(
            bus_id = %self.id(),
            event_id = %envelope.event_id(),
            event_type = envelope.event_type(),
            "Sending event"
        );

        self.inner.dispatcher.dispatch(self, &envelope).await?;
        Ok(())
    }

    /// Dispatch an event inline with the bus itself as source
    pub async fn send_anonymous<E: Event>(&self, event: E) -> Result<()> {
        self.send(None, event).await
    }

    /// Fire `event` after `delay`, and then every `delay` if `repeat` is set.
    ///
    /// Repeating schedules run until the bus is shut down. A repeating
    /// schedule with a zero period is rejected.
    pub fn schedule<E: Event>(
        &self,
        source: Option<Source>,
        delay: Duration,
        repeat: bool,
        event: E,
    ) -> Result<()> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        self.inner
            .scheduler
            .schedule(self.clone(), source, delay, repeat, event)
    }

    pub(crate) async fn enqueue(&self, envelope: EventEnvelope) -> Result<()> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        self.inner.queue.push(envelope).await
    }

    /// Stop accepting queued work.
    ///
    /// Workers finish the events already queued and then exit; this call does
    /// not wait for them. Fails with [`Error::AlreadyShutDown`] when called twice.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.is_shutting_down.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyShutDown);
        }

        info!(bus_id = %self.id(), "Shutting down EventBus");
        self.inner.queue.close().await
    }

    /// Shut down and wait for the workers to drain the queue, bounded by
    /// the configured `shutdown_timeout`.
    ///
    /// Must not be awaited from inside a handler running on a worker.
    pub async fn shutdown_and_wait(&self) -> Result<()> {
        match self.shutdown().await {
            Ok(()) | Err(Error::AlreadyShutDown) => {}
            Err(e) => return Err(e),
        }

        self.inner
            .pool
            .join(self.inner.config.shutdown_timeout)
            .await?;

        info!(bus_id = %self.id(), "EventBus shutdown complete");
        Ok(())
    }

    /// Check if the event bus is shutting down
    pub fn is_shutting_down(&self) -> bool {
        self.inner.is_shutting_down.load(Ordering::Acquire)
    }

    /// The dispatcher shared by `send` and the workers
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The scheduler behind [`schedule`](Self::schedule)
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Get statistics about the event bus
    pub fn stats(&self) -> EventBusStats {
        let mut dispatcher = self.inner.dispatcher.stats();
        dispatcher.queued = self.inner.queue.len();
        dispatcher.workers = self.inner.pool.num_workers();

        EventBusStats {
            total_subscriptions: self.inner.registry.total_bindings(),
            event_types: self.inner.registry.event_types().len(),
            active_workers: self.inner.pool.alive(),
            scheduled_timers: self.inner.scheduler.active(),
            dispatcher,
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

/// Statistics about the event bus
#[derive(Debug, Clone)]
pub struct EventBusStats {
    /// Total number of bindings
    pub total_subscriptions: usize,

    /// Number of distinct event types with at least one binding
    pub event_types: usize,

    /// Workers still running
    pub active_workers: usize,

    /// Schedule timers not yet finished
    pub scheduled_timers: usize,

    /// Dispatcher statistics
    pub dispatcher: DispatcherStats,
}

impl fmt::Display for EventBusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventBus Stats: {} subscriptions, {} event types, {} events dispatched, {} queued",
            self.total_subscriptions,
            self.event_types,
            self.dispatcher.events_dispatched,
            self.dispatcher.queued
        )
    }
}
