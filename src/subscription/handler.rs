//! Event handler traits and the type-erased callable they are adapted into.

use crate::bus::EventBus;
use crate::event::{Event, Source};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type alias for a boxed future that handlers return
pub type HandlerFuture = BoxFuture<'static, Result<()>>;

/// Type-erased callable stored in a binding.
pub(crate) type Callable = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

/// Arguments of a single handler call.
///
/// Typed handlers never see this; it is what [`Handler::dynamic`](super::Handler::dynamic)
/// callables receive.
pub struct Invocation {
    /// The bus the event was published on
    pub bus: EventBus,

    /// Resolved source; only present for three-parameter handlers
    pub source: Option<Source>,

    /// The payload
    pub event: Arc<dyn Any + Send + Sync>,

    /// Runtime type name of the payload
    pub event_type: &'static str,
}

impl Invocation {
    /// Borrow the payload as `E`
    pub fn event<E: Event>(&self) -> Option<&E> {
        self.event.downcast_ref::<E>()
    }

    fn take_event<E: Event>(&self) -> Result<E> {
        self.event::<E>().cloned().ok_or(Error::TypeMismatch {
            expected: E::event_type(),
            actual: self.event_type,
        })
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("bus", &self.bus.id())
            .field("source", &self.source)
            .field("event_type", &self.event_type)
            .finish()
    }
}

/// An object that handles events of type `E` given `(bus, event)`.
///
/// # Example
///
/// ```rust
/// use tokio_event_bus::{async_trait, EventBus, EventHandler, Result};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl EventHandler<String> for Greeter {
///     async fn on_event(&self, _bus: EventBus, name: String) -> Result<()> {
///         println!("hello {name}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Process one event
    async fn on_event(&self, bus: EventBus, event: E) -> Result<()>;

    /// Get the handler name for debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An object that handles events of type `E` given `(bus, source, event)`.
#[async_trait]
pub trait SourcedEventHandler<E: Event>: Send + Sync + 'static {
    /// Process one event published by `source`
    async fn on_event(&self, bus: EventBus, source: Source, event: E) -> Result<()>;

    /// Get the handler name for debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

fn mismatch(error: Error) -> HandlerFuture {
    future::ready(Err(error)).boxed()
}

pub(crate) fn erase_fn<E, F, Fut>(function: F) -> Callable
where
    E: Event,
    F: Fn(EventBus, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |invocation: Invocation| match invocation.take_event::<E>() {
        Ok(event) => function(invocation.bus, event).boxed(),
        Err(e) => mismatch(e),
    })
}

pub(crate) fn erase_sourced_fn<E, F, Fut>(function: F) -> Callable
where
    E: Event,
    F: Fn(EventBus, Source, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |invocation: Invocation| match invocation.take_event::<E>() {
        Ok(event) => {
            let source = invocation
                .source
                .unwrap_or_else(|| Source::from(&invocation.bus));
            function(invocation.bus, source, event).boxed()
        }
        Err(e) => mismatch(e),
    })
}

pub(crate) fn erase_object<E, H>(handler: Arc<H>) -> Callable
where
    E: Event,
    H: EventHandler<E>,
{
    Arc::new(move |invocation: Invocation| match invocation.take_event::<E>() {
        Ok(event) => {
            let handler = Arc::clone(&handler);
            let bus = invocation.bus;
            async move { handler.on_event(bus, event).await }.boxed()
        }
        Err(e) => mismatch(e),
    })
}

pub(crate) fn erase_sourced_object<E, H>(handler: Arc<H>) -> Callable
where
    E: Event,
    H: SourcedEventHandler<E>,
{
    Arc::new(move |invocation: Invocation| match invocation.take_event::<E>() {
        Ok(event) => {
            let handler = Arc::clone(&handler);
            let source = invocation
                .source
                .unwrap_or_else(|| Source::from(&invocation.bus));
            let bus = invocation.bus;
            async move { handler.on_event(bus, source, event).await }.boxed()
        }
        Err(e) => mismatch(e),
    })
}
