//! Core event types.
//!
//! Any `Clone + Send + Sync + 'static` value can travel through the bus as an
//! event. Matching between a payload and a handler is nominal: a handler
//! declared for `T` only ever sees payloads whose runtime type is exactly `T`.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub mod envelope;
pub mod metadata;
pub mod source;

pub use envelope::EventEnvelope;
pub use metadata::{EventMetadata, Origin};
pub use source::Source;

/// Marker trait for values that can be published on the bus.
///
/// Implemented for every cloneable, thread-safe `'static` type, so strings,
/// integers and user structs can be published without extra boilerplate.
///
/// # Example
///
/// ```rust
/// use tokio_event_bus::Event;
///
/// #[derive(Debug, Clone)]
/// struct UserRegistered {
///     user_id: u64,
/// }
///
/// assert!(UserRegistered::event_type().ends_with("UserRegistered"));
/// ```
pub trait Event: Any + Send + Sync + Clone + 'static {
    /// Returns the fully qualified type name of this event.
    ///
    /// Used for logging only; routing keys on [`TypeTag`].
    fn event_type() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Get the tag used to route this event type.
    fn type_tag() -> TypeTag
    where
        Self: Sized,
    {
        TypeTag::of::<Self>()
    }
}

impl<T> Event for T where T: Any + Send + Sync + Clone + 'static {}

/// Runtime type descriptor captured at registration and publish time.
///
/// Identity is the language-native [`TypeId`]; the name is carried along for
/// diagnostics and never takes part in comparisons, so two types that share a
/// name in different modules stay distinct.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a payload of type `self` may be delivered to a parameter declared as `declared`.
    pub fn matches(&self, declared: &TypeTag) -> bool {
        matches(self, declared)
    }
}

/// Decides whether a payload's runtime type matches a declared parameter type.
///
/// Exact-type matching only: there is no notion of subtyping or trait
/// compatibility between tags.
pub fn matches(actual: &TypeTag, declared: &TypeTag) -> bool {
    actual.id == declared.id
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        matches(self, other)
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
