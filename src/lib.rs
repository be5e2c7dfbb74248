//! # tokio-event-bus
//!
//! An in-process publish/subscribe event bus built on Tokio.
//!
//! ## Features
//!
//! - **Type-routed** delivery: a handler only sees events of the type it declares
//! - **Two publish paths**: `send` dispatches inline, `fire` goes through a
//!   bounded queue drained by a worker pool
//! - **Scheduled** one-shot and repeating events
//! - **Source-aware** handlers that learn who published an event
//! - **Thread-safe** subscription, even from inside a running handler
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use tokio_event_bus::{EventBus, Handler, Source};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)]
//! struct UserRegistered {
//!     user_id: u64,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create event bus
//!     let bus = EventBus::builder().cache_size(64).pool_size(4).build().await?;
//!
//!     // Subscribe to events
//!     bus.subscribe(Handler::from_fn(|_bus: EventBus, event: UserRegistered| async move {
//!         println!("New user registered: {}", event.email);
//!         Ok(())
//!     }));
//!
//!     // Publish events
//!     bus.fire(Some(Source::new("signup-form")), UserRegistered {
//!         user_id: 123,
//!         email: "user@example.com".to_string(),
//!     }).await?;
//!
//!     // Remind every minute
//!     bus.schedule(None, Duration::from_secs(60), true, "reminder")?;
//!
//!     bus.shutdown_and_wait().await?;
//!     Ok(())
//! }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    unreachable_pub
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Core event system traits and types
pub mod event;

/// Error types and result aliases
pub mod error;

/// Handler bindings indexed by event type
pub mod registry;

/// Handler construction and validation
pub mod subscription;

/// Event dispatcher, work queue and worker pool
pub mod dispatcher;

/// Delayed and periodic publishing
pub mod scheduler;

/// The main event bus implementation
pub mod bus;

// Re-export commonly used types
pub use bus::{EventBus, EventBusBuilder, EventBusConfig, EventBusStats};
pub use error::{Error, Result};
pub use event::{Event, EventEnvelope, EventMetadata, Origin, Source, TypeTag};
pub use subscription::{
    EventHandler, Handler, HandlerFuture, Invocation, Rejection, SourcedEventHandler,
};

pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// # Example
/// ```rust
/// use tokio_event_bus::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bus::{EventBus, EventBusBuilder, EventBusConfig};
    pub use crate::error::{Error, Result};
    pub use crate::event::{Event, Source};
    pub use crate::subscription::{EventHandler, Handler, SourcedEventHandler};
    pub use async_trait::async_trait;
}
