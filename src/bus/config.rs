//! Configuration for the event bus.

use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the event bus
///
/// Can be deserialized from configuration files; missing fields take their
/// defaults.
///
/// ```rust
/// use tokio_event_bus::EventBusConfig;
///
/// let config = EventBusConfig::from_json(r#"{ "cache_size": 64, "pool_size": 0 }"#).unwrap();
/// assert_eq!(config.cache_size, 64);
/// assert!(config.resolved_pool_size() >= 1);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Capacity of the work queue behind `fire`; values below 1 are treated as 1
    pub cache_size: usize,

    /// Number of workers draining the queue; 0 means one per logical core
    pub pool_size: usize,

    /// How long `shutdown_and_wait` waits for workers to drain
    pub shutdown_timeout: Duration,

    /// Worker name prefix used in logs
    pub worker_name_prefix: String,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            cache_size: 1,
            pool_size: 1,
            shutdown_timeout: Duration::from_secs(30),
            worker_name_prefix: "event-worker".to_string(),
        }
    }
}

impl EventBusConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Set the work queue capacity
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the number of workers; 0 selects one per logical core
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set shutdown timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the worker name prefix
    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_name_prefix = prefix.into();
        self
    }

    /// Effective queue capacity
    pub fn resolved_cache_size(&self) -> usize {
        self.cache_size.max(1)
    }

    /// Effective number of workers
    pub fn resolved_pool_size(&self) -> usize {
        match self.pool_size {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

/// Preset configurations for common use cases
impl EventBusConfig {
    /// One worker per logical core with a queue deep enough to keep them busy
    pub fn auto_pool() -> Self {
        let workers = num_cpus::get();
        Self::default().pool_size(0).cache_size(workers * 16)
    }

    /// Configuration for testing
    pub fn test() -> Self {
        Self::default()
            .cache_size(16)
            .pool_size(2)
            .shutdown_timeout(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EventBusConfig::default();
        assert_eq!(config.cache_size, 1);
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.resolved_pool_size(), 1);
    }

    #[test]
    fn test_resolution() {
        let config = EventBusConfig::new().cache_size(0).pool_size(0);
        assert_eq!(config.resolved_cache_size(), 1);
        assert_eq!(config.resolved_pool_size(), num_cpus::get());

        let config = EventBusConfig::auto_pool();
        assert_eq!(config.resolved_pool_size(), num_cpus::get());
        assert!(config.resolved_cache_size() >= 16);
    }

    #[test]
    fn test_from_json() {
        let config = EventBusConfig::from_json(
            r#"{ "pool_size": 4, "shutdown_timeout": { "secs": 2, "nanos": 0 } }"#,
        )
        .unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.cache_size, 1);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.worker_name_prefix, "event-worker");

        let err = EventBusConfig::from_json(r#"{ "pool_size": -1 }"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
