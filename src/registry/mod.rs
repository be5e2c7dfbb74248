//! Handler registry.
//!
//! The registry owns every validated [`HandlerBinding`]. It is appended to by
//! `subscribe` and read by every dispatch through [`HandlerRegistry::snapshot`],
//! which copies the bindings out so that no lock is held while handlers run.

use crate::bus::EventBus;
use crate::event::{EventEnvelope, Source, TypeTag};
use crate::subscription::{Callable, HandlerFuture, Invocation};
use std::fmt::{self, Debug};
use std::sync::Arc;
use uuid::Uuid;

mod dashmap;
pub use self::dashmap::DashMapRegistry;

/// Number of parameters a handler declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `(bus, event)`
    Two,
    /// `(bus, source, event)`
    Three,
}

/// A validated, invocable handler.
pub struct HandlerBinding {
    id: Uuid,
    name: String,
    arity: Arity,
    params: Vec<TypeTag>,
    callable: Callable,
}

impl HandlerBinding {
    pub(crate) fn new(
        id: Uuid,
        name: String,
        arity: Arity,
        params: Vec<TypeTag>,
        callable: Callable,
    ) -> Self {
        Self {
            id,
            name,
            arity,
            params,
            callable,
        }
    }

    /// Unique ID for this binding
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handler name for debugging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arity
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// The event type this binding receives (its last parameter)
    pub fn event_type(&self) -> TypeTag {
        // bind() guarantees two or three params
        self.params[self.params.len() - 1]
    }

    /// Whether an event of runtime type `actual` should reach this binding
    pub fn accepts(&self, actual: &TypeTag) -> bool {
        actual.matches(&self.event_type())
    }

    /// Call the handler with the arguments its arity asks for.
    pub(crate) fn invoke(
        &self,
        bus: &EventBus,
        source: &Source,
        envelope: &EventEnvelope,
    ) -> HandlerFuture {
        let source = match self.arity {
            Arity::Two => None,
            Arity::Three => Some(source.clone()),
        };

        (self.callable)(Invocation {
            bus: bus.clone(),
            source,
            event: envelope.clone_payload(),
            event_type: envelope.event_type(),
        })
    }
}

impl Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("params", &self.params)
            .finish()
    }
}

/// Trait for registries that hold handler bindings.
///
/// Implementations must be thread-safe: `register` and `snapshot` are called
/// concurrently from publishers, workers and subscribers.
pub trait HandlerRegistry: Send + Sync + Debug {
    /// Append a binding. Bindings for one event type keep insertion order.
    fn register(&self, binding: HandlerBinding);

    /// Copy out the bindings that accept `event_type`, in subscription order
    fn snapshot(&self, event_type: &TypeTag) -> Vec<Arc<HandlerBinding>>;

    /// Get total number of bindings across all event types
    fn total_bindings(&self) -> usize;

    /// Get number of bindings for a specific event type
    fn binding_count(&self, event_type: &TypeTag) -> usize;

    /// Get all event types that have at least one binding
    fn event_types(&self) -> Vec<TypeTag>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Origin;
    use futures::FutureExt;

    fn binding(arity: Arity, params: Vec<TypeTag>) -> HandlerBinding {
        let callable: Callable =
            Arc::new(|_invocation: Invocation| -> HandlerFuture { async { Ok(()) }.boxed() });
        HandlerBinding::new(Uuid::new_v4(), "test".into(), arity, params, callable)
    }

    #[test]
    fn test_binding_event_type() {
        let b = binding(
            Arity::Three,
            vec![TypeTag::of::<EventBus>(), TypeTag::of::<Source>(), TypeTag::of::<String>()],
        );

        assert_eq!(b.event_type(), TypeTag::of::<String>());
        assert!(b.accepts(&TypeTag::of::<String>()));
        assert!(!b.accepts(&TypeTag::of::<&'static str>()));
    }

    #[tokio::test]
    async fn test_invoke_passes_source_by_arity() {
        let bus = EventBus::builder().build().await.unwrap();
        let source = Source::new(1u8);
        let envelope = EventEnvelope::new("payload".to_string(), None, Origin::Send);

        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for (arity, expect_source) in [(Arity::Two, false), (Arity::Three, true)] {
            let seen = seen.clone();
            let callable: Callable = Arc::new(move |invocation: Invocation| -> HandlerFuture {
                assert_eq!(invocation.source.is_some(), expect_source);
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Ok(()) }.boxed()
            });
            let b = HandlerBinding::new(
                Uuid::new_v4(),
                "probe".into(),
                arity,
                vec![TypeTag::of::<EventBus>(), TypeTag::of::<String>()],
                callable,
            );
            b.invoke(&bus, &source, &envelope).await.unwrap();
        }
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);

        bus.shutdown().await.unwrap();
    }
}
