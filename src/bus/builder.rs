//! Builder pattern for constructing EventBus instances.

use crate::bus::config::EventBusConfig;
use crate::bus::{EventBus, Inner};
use crate::dispatcher::{Dispatcher, WorkQueue, WorkerConfig, WorkerPool};
use crate::registry::{DashMapRegistry, HandlerRegistry};
use crate::scheduler::Scheduler;
use crate::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;
use uuid::Uuid;

/// Builder for creating EventBus instances
#[derive(Debug)]
pub struct EventBusBuilder {
    config: EventBusConfig,
    registry: Option<Arc<dyn HandlerRegistry>>,
}

impl EventBusBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EventBusConfig::default(),
            registry: None,
        }
    }

    /// Use a custom configuration
    pub fn config(mut self, config: EventBusConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure the event bus
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(EventBusConfig) -> EventBusConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Set the work queue capacity
    pub fn cache_size(self, size: usize) -> Self {
        self.configure(|c| c.cache_size(size))
    }

    /// Set the number of workers; 0 selects one per logical core
    pub fn pool_size(self, size: usize) -> Self {
        self.configure(|c| c.pool_size(size))
    }

    /// Use a custom registry implementation
    pub fn registry(mut self, registry: Arc<dyn HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the EventBus and start its workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn build(self) -> Result<EventBus> {
        let registry = self.registry.unwrap_or_else(|| {
            info!("Creating default DashMapRegistry");
            Arc::new(DashMapRegistry::with_capacity(64))
        });

        let queue = WorkQueue::new(self.config.resolved_cache_size());
        let pool = WorkerPool::new(WorkerConfig {
            num_workers: self.config.resolved_pool_size(),
            name_prefix: self.config.worker_name_prefix.clone(),
        });

        let bus = EventBus {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                dispatcher: Dispatcher::new(registry.clone()),
                registry,
                queue,
                pool,
                scheduler: Scheduler::new(Handle::current()),
                is_shutting_down: AtomicBool::new(false),
                config: self.config,
            }),
        };

        info!(
            bus_id = %bus.id(),
            cache_size = bus.inner.queue.capacity(),
            pool_size = bus.inner.pool.num_workers(),
            "Building EventBus"
        );

        bus.inner
            .pool
            .start(bus.inner.queue.receiver(), bus.clone())
            .await?;

        info!(bus_id = %bus.id(), "EventBus built successfully");
        Ok(bus)
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
