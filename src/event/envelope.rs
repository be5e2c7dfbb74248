//! Event envelope for type-erased event storage and transmission.

use crate::event::{Event, EventMetadata, Origin, Source, TypeTag};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased published event together with its optional source.
///
/// Envelopes are what the work queue carries: created by `fire` or a
/// scheduler timer, consumed once by a worker, then dropped. `send` builds one
/// too so that both paths share the dispatcher.
#[derive(Clone)]
pub struct EventEnvelope {
    /// The type-erased event payload
    payload: Arc<dyn Any + Send + Sync>,

    /// Runtime type of the payload
    tag: TypeTag,

    /// Explicit source; `None` means the bus itself
    source: Option<Source>,

    /// Event metadata
    pub metadata: EventMetadata,
}

impl EventEnvelope {
    /// Create a new envelope from an event
    pub fn new<T: Event>(event: T, source: Option<Source>, origin: Origin) -> Self {
        Self {
            payload: Arc::new(event),
            tag: T::type_tag(),
            source,
            metadata: EventMetadata::new(origin),
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        self.tag.name()
    }

    /// Runtime type tag of the payload
    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    /// The explicit source, if the publisher supplied one
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Get the event ID
    pub fn event_id(&self) -> uuid::Uuid {
        self.metadata.event_id
    }

    /// Try to downcast to a specific event type
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        if self.is::<T>() {
            self.payload.downcast_ref::<T>()
        } else {
            None
        }
    }

    /// Check if this envelope contains a specific event type
    pub fn is<T: Event>(&self) -> bool {
        self.tag.matches(&T::type_tag())
    }

    /// Clone the inner event payload
    pub fn clone_payload(&self) -> Arc<dyn Any + Send + Sync> {
        self.payload.clone()
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("type_name", &self.tag.name())
            .field("event_id", &self.metadata.event_id)
            .field("origin", &self.metadata.origin)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestEvent {
        id: u64,
    }

    #[test]
    fn test_envelope_creation() {
        let envelope = EventEnvelope::new(TestEvent { id: 123 }, None, Origin::Fire);

        assert!(envelope.event_type().ends_with("TestEvent"));
        assert_eq!(envelope.type_tag(), TypeTag::of::<TestEvent>());
        assert!(envelope.is::<TestEvent>());
        assert!(!envelope.is::<String>());
        assert!(envelope.source().is_none());
    }

    #[test]
    fn test_envelope_downcast() {
        let source = Source::new("sensor-1");
        let envelope =
            EventEnvelope::new(TestEvent { id: 456 }, Some(source.clone()), Origin::Send);

        assert_eq!(envelope.downcast_ref::<TestEvent>().map(|e| e.id), Some(456));
        assert!(envelope.downcast_ref::<String>().is_none());
        assert_eq!(envelope.source(), Some(&source));
        assert_eq!(envelope.metadata.origin, Origin::Send);
    }
}
