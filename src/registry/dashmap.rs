//! DashMap-based implementation of HandlerRegistry for concurrent access.

use super::{HandlerBinding, HandlerRegistry};
use crate::event::TypeTag;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// A thread-safe handler registry backed by DashMap.
///
/// Bindings are grouped by the event type they accept. Each group is an
/// append-only vector guarded by its shard lock, so appends are linearized
/// per type and a snapshot never observes a half-pushed binding. Readers
/// clone the group out and release the lock before any handler runs.
#[derive(Debug, Clone, Default)]
pub struct DashMapRegistry {
    /// Map from event type to bindings in subscription order
    bindings: Arc<DashMap<TypeTag, Vec<Arc<HandlerBinding>>>>,

    /// Total number of bindings
    total: Arc<AtomicUsize>,
}

impl DashMapRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: Arc::new(DashMap::with_capacity(capacity)),
            total: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl HandlerRegistry for DashMapRegistry {
    fn register(&self, binding: HandlerBinding) {
        let event_type = binding.event_type();

        trace!(
            binding_id = %binding.id(),
            event_type = %event_type,
            "Registering binding"
        );

        let binding = Arc::new(binding);
        self.bindings
            .entry(event_type)
            .or_default()
            .push(Arc::clone(&binding));
        self.total.fetch_add(1, Ordering::AcqRel);

        debug!(
            binding_id = %binding.id(),
            handler = binding.name(),
            "Binding registered"
        );
    }

    fn snapshot(&self, event_type: &TypeTag) -> Vec<Arc<HandlerBinding>> {
        self.bindings
            .get(event_type)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|b| b.accepts(event_type))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn total_bindings(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    fn binding_count(&self, event_type: &TypeTag) -> usize {
        self.bindings
            .get(event_type)
            .map(|bindings| bindings.len())
            .unwrap_or(0)
    }

    fn event_types(&self) -> Vec<TypeTag> {
        self.bindings.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::subscription::Handler;
    use std::thread;

    #[derive(Debug, Clone)]
    struct TestEvent;

    #[derive(Debug, Clone)]
    struct AnotherEvent;

    fn binding<E: crate::Event>(name: &str) -> HandlerBinding {
        Handler::from_fn(|_bus: EventBus, _event: E| async { Ok(()) })
            .with_name(name)
            .bind()
            .unwrap()
    }

    #[test]
    fn test_register_and_snapshot() {
        let registry = DashMapRegistry::new();
        let b = binding::<TestEvent>("first");
        let id = b.id();

        registry.register(b);

        let snapshot = registry.snapshot(&TypeTag::of::<TestEvent>());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), id);
        assert!(registry.snapshot(&TypeTag::of::<AnotherEvent>()).is_empty());
    }

    #[test]
    fn test_insertion_order_and_duplicates() {
        let registry = DashMapRegistry::with_capacity(4);

        for i in 0..3 {
            registry.register(binding::<TestEvent>(&format!("handler-{}", i)));
        }
        registry.register(binding::<TestEvent>("handler-0"));
        registry.register(binding::<AnotherEvent>("other"));

        let names: Vec<String> = registry
            .snapshot(&TypeTag::of::<TestEvent>())
            .iter()
            .map(|b| b.name().to_string())
            .collect();
        assert_eq!(names, ["handler-0", "handler-1", "handler-2", "handler-0"]);

        assert_eq!(registry.binding_count(&TypeTag::of::<TestEvent>()), 4);
        assert_eq!(registry.binding_count(&TypeTag::of::<AnotherEvent>()), 1);
        assert_eq!(registry.total_bindings(), 5);
        assert_eq!(registry.event_types().len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = DashMapRegistry::new();
        registry.register(binding::<TestEvent>("a"));

        let snapshot = registry.snapshot(&TypeTag::of::<TestEvent>());
        registry.register(binding::<TestEvent>("b"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot(&TypeTag::of::<TestEvent>()).len(), 2);
    }

    #[test]
    fn test_concurrent_register() {
        let registry = DashMapRegistry::new();

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        registry.register(binding::<TestEvent>(&format!("{}-{}", t, i)));
                        let _ = registry.snapshot(&TypeTag::of::<TestEvent>());
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.total_bindings(), 400);
        assert_eq!(registry.binding_count(&TypeTag::of::<TestEvent>()), 400);
    }
}
