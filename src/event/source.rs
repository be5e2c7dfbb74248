//! Originator identity attached to published events.

use crate::bus::EventBus;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifies who published an event.
///
/// A source is either the bus itself (the default when a publisher does not
/// supply one) or an arbitrary shared value. Cloning is cheap.
#[derive(Clone)]
pub struct Source {
    kind: SourceKind,
}

#[derive(Clone)]
enum SourceKind {
    Bus(Uuid),
    Value {
        value: Arc<dyn Any + Send + Sync>,
        type_name: &'static str,
    },
}

impl Source {
    /// Wrap an arbitrary value as a source
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value; equality with other sources is by pointer
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            kind: SourceKind::Value {
                value,
                type_name: std::any::type_name::<T>(),
            },
        }
    }

    pub(crate) fn bus(id: Uuid) -> Self {
        Self {
            kind: SourceKind::Bus(id),
        }
    }

    /// Whether this source is the given bus
    pub fn is_bus(&self, bus: &EventBus) -> bool {
        matches!(self.kind, SourceKind::Bus(id) if id == bus.id())
    }

    /// Id of the bus this source refers to, if it is a bus
    pub fn bus_id(&self) -> Option<Uuid> {
        match self.kind {
            SourceKind::Bus(id) => Some(id),
            SourceKind::Value { .. } => None,
        }
    }

    /// Borrow the wrapped value if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.kind {
            SourceKind::Value { value, .. } => value.downcast_ref::<T>(),
            SourceKind::Bus(_) => None,
        }
    }

    /// Type name of the wrapped value, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SourceKind::Bus(_) => std::any::type_name::<EventBus>(),
            SourceKind::Value { type_name, .. } => type_name,
        }
    }
}

impl From<&EventBus> for Source {
    fn from(bus: &EventBus) -> Self {
        Source::bus(bus.id())
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (SourceKind::Bus(a), SourceKind::Bus(b)) => a == b,
            (SourceKind::Value { value: a, .. }, SourceKind::Value { value: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl PartialEq<EventBus> for Source {
    fn eq(&self, bus: &EventBus) -> bool {
        self.is_bus(bus)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SourceKind::Bus(id) => f.debug_tuple("Source::Bus").field(id).finish(),
            SourceKind::Value { type_name, .. } => {
                f.debug_tuple("Source::Value").field(type_name).finish()
            }
        }
    }
}
