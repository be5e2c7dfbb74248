//! Handler construction and signature validation.
//!
//! Every handler shape (closure or object, with or without a source
//! parameter, or a dynamically described callable) is unified into a single
//! [`Handler`] value: a name, an ordered parameter-type list, and a
//! type-erased callable. [`Handler::bind`] checks the signature and produces
//! the [`HandlerBinding`] that the registry stores.

use crate::bus::EventBus;
use crate::event::{Event, Source, TypeTag};
use crate::registry::{Arity, HandlerBinding};
use crate::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod handler;

pub(crate) use handler::Callable;
pub use handler::{EventHandler, HandlerFuture, Invocation, SourcedEventHandler};

/// Reason a handler was refused by `subscribe`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The callable does not take `(bus, event)` or `(bus, source, event)`
    #[error("handler takes {0} parameters, expected 2 or 3")]
    WrongArity(usize),

    /// The first parameter is not the event bus
    #[error("first parameter must be the event bus, found {0}")]
    NotBusParameter(&'static str),
}

/// A handler ready to be subscribed.
///
/// # Example
///
/// ```rust
/// use tokio_event_bus::{EventBus, Handler, Source};
///
/// let plain = Handler::from_fn(|_bus: EventBus, text: String| async move {
///     println!("{text}");
///     Ok(())
/// });
///
/// let sourced = Handler::from_sourced_fn(|bus: EventBus, source: Source, n: u32| async move {
///     println!("{n} from self: {}", source.is_bus(&bus));
///     Ok(())
/// });
///
/// assert_eq!(plain.params().len(), 2);
/// assert_eq!(sourced.params().len(), 3);
/// ```
pub struct Handler {
    name: String,
    params: Vec<TypeTag>,
    callable: Callable,
}

impl Handler {
    /// Handler from a closure taking `(bus, event)`
    pub fn from_fn<E, F, Fut>(function: F) -> Self
    where
        E: Event,
        F: Fn(EventBus, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: format!("FunctionHandler<{}>", E::event_type()),
            params: vec![TypeTag::of::<EventBus>(), E::type_tag()],
            callable: handler::erase_fn(function),
        }
    }

    /// Handler from a closure taking `(bus, source, event)`
    pub fn from_sourced_fn<E, F, Fut>(function: F) -> Self
    where
        E: Event,
        F: Fn(EventBus, Source, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: format!("FunctionHandler<{}>", E::event_type()),
            params: vec![TypeTag::of::<EventBus>(), TypeTag::of::<Source>(), E::type_tag()],
            callable: handler::erase_sourced_fn(function),
        }
    }

    /// Handler from an object implementing [`EventHandler`]
    pub fn from_object<E, H>(handler: H) -> Self
    where
        E: Event,
        H: EventHandler<E>,
    {
        let handler = Arc::new(handler);
        Self {
            name: handler.name().to_string(),
            params: vec![TypeTag::of::<EventBus>(), E::type_tag()],
            callable: handler::erase_object::<E, H>(handler),
        }
    }

    /// Handler from an object implementing [`SourcedEventHandler`]
    pub fn from_sourced_object<E, H>(handler: H) -> Self
    where
        E: Event,
        H: SourcedEventHandler<E>,
    {
        let handler = Arc::new(handler);
        Self {
            name: handler.name().to_string(),
            params: vec![TypeTag::of::<EventBus>(), TypeTag::of::<Source>(), E::type_tag()],
            callable: handler::erase_sourced_object::<E, H>(handler),
        }
    }

    /// Handler whose signature is described at run time.
    ///
    /// `params` lists the declared parameter types in order. It is validated
    /// on subscription like any other handler: two or three parameters, the
    /// first one being [`EventBus`]. The last parameter decides which events
    /// reach `function`.
    pub fn dynamic<F>(name: impl Into<String>, params: Vec<TypeTag>, function: F) -> Self
    where
        F: Fn(Invocation) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            callable: Arc::new(function),
        }
    }

    /// Override the diagnostic name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types, in order
    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    /// Validate the signature and resolve the binding.
    pub(crate) fn bind(self) -> std::result::Result<HandlerBinding, Rejection> {
        let arity = match self.params.len() {
            2 => Arity::Two,
            3 => Arity::Three,
            n => return Err(Rejection::WrongArity(n)),
        };

        let bus = TypeTag::of::<EventBus>();
        if !self.params[0].matches(&bus) {
            return Err(Rejection::NotBusParameter(self.params[0].name()));
        }

        Ok(HandlerBinding::new(
            Uuid::new_v4(),
            self.name,
            arity,
            self.params,
            self.callable,
        ))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn noop(_invocation: Invocation) -> HandlerFuture {
        async { Ok(()) }.boxed()
    }

    #[test]
    fn test_typed_handlers_bind() {
        let binding = Handler::from_fn(|_bus: EventBus, _event: String| async { Ok(()) })
            .bind()
            .unwrap();
        assert_eq!(binding.arity(), Arity::Two);
        assert_eq!(binding.event_type(), TypeTag::of::<String>());

        let binding =
            Handler::from_sourced_fn(|_bus: EventBus, _source: Source, _event: u8| async { Ok(()) })
                .with_name("bytes")
                .bind()
                .unwrap();
        assert_eq!(binding.arity(), Arity::Three);
        assert_eq!(binding.event_type(), TypeTag::of::<u8>());
        assert_eq!(binding.name(), "bytes");
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let bus = TypeTag::of::<EventBus>();
        let string = TypeTag::of::<String>();

        for params in [
            vec![],
            vec![bus],
            vec![bus, TypeTag::of::<Source>(), string, string],
        ] {
            let n = params.len();
            let err = Handler::dynamic("dyn", params, noop).bind().unwrap_err();
            assert_eq!(err, Rejection::WrongArity(n));
        }
    }

    #[test]
    fn test_first_parameter_must_be_bus() {
        let params = vec![TypeTag::of::<String>(), TypeTag::of::<i32>()];
        let err = Handler::dynamic("dyn", params, noop).bind().unwrap_err();
        assert_eq!(err, Rejection::NotBusParameter("alloc::string::String"));
    }

    #[test]
    fn test_dynamic_handler_binds() {
        let params = vec![TypeTag::of::<EventBus>(), TypeTag::of::<Source>(), TypeTag::of::<i64>()];
        let binding = Handler::dynamic("dyn", params, noop).bind().unwrap();
        assert_eq!(binding.arity(), Arity::Three);
        assert_eq!(binding.event_type(), TypeTag::of::<i64>());
    }
}
