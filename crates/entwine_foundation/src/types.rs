//! Type descriptors used as component kinds.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type descriptor identifying a component kind.
///
/// Structural variants describe the shape of the payload and are checked on
/// every component write. [`Type::Named`] is a nominal kind: it accepts any
/// payload and exists so that two differently-named kinds never collide.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// The nil type (only value: nil).
    Nil,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// String type.
    String,
    /// Entity reference type.
    EntityRef,
    /// Homogeneous vector type.
    Vec(Box<Type>),
    /// Homogeneous set type.
    Set(Box<Type>),
    /// Homogeneous map type.
    Map(Box<Type>, Box<Type>),
    /// Optional type (value or nil).
    Option(Box<Type>),
    /// Any type (accepts any value).
    Any,
    /// Nominal, user-declared kind (accepts any value).
    Named(Arc<str>),
}

impl Type {
    /// Creates a vector type with the given element type.
    #[must_use]
    pub fn vec(element: Type) -> Self {
        Self::Vec(Box::new(element))
    }

    /// Creates a set type with the given element type.
    #[must_use]
    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    /// Creates a map type with the given key and value types.
    #[must_use]
    pub fn map(key: Type, value: Type) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Creates an optional type.
    #[must_use]
    pub fn option(inner: Type) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Creates a nominal kind.
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    /// Returns true if this type is `Any`.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Checks if a value type is accepted by this type.
    ///
    /// - `Any` and `Named` accept all types
    /// - `Option(T)` accepts `Nil` and any type that `T` accepts
    /// - Primitive types must match exactly (`Float` also accepts `Int`)
    /// - Collection types check element types recursively
    #[must_use]
    pub fn accepts(&self, value_type: &Type) -> bool {
        if matches!(self, Self::Any | Self::Named(_)) {
            return true;
        }

        if let Self::Option(inner) = self {
            return matches!(value_type, Self::Nil) || inner.accepts(value_type);
        }

        match (self, value_type) {
            (Self::Nil, Self::Nil)
            | (Self::Bool, Self::Bool)
            | (Self::Int | Self::Float, Self::Int)
            | (Self::Float, Self::Float)
            | (Self::String, Self::String)
            | (Self::EntityRef, Self::EntityRef) => true,

            // Runtime collection values report `Any` elements; element types
            // are not inspected.
            (Self::Vec(expected), Self::Vec(actual)) | (Self::Set(expected), Self::Set(actual)) => {
                actual.is_any() || expected.accepts(actual)
            }
            (Self::Map(expected_k, expected_v), Self::Map(actual_k, actual_v)) => {
                (actual_k.is_any() && actual_v.is_any())
                    || (expected_k.accepts(actual_k) && expected_v.accepts(actual_v))
            }

            _ => false,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::EntityRef => write!(f, "entity-ref"),
            Self::Vec(t) => write!(f, "vec<{t:?}>"),
            Self::Set(t) => write!(f, "set<{t:?}>"),
            Self::Map(k, v) => write!(f, "map<{k:?}, {v:?}>"),
            Self::Option(t) => write!(f, "option<{t:?}>"),
            Self::Any => write!(f, "any"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
