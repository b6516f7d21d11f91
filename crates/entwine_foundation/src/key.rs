//! Keys addressing the registry's indices.
//!
//! Component storage and tag storage use separate namespaces, but relation
//! labels share one: a [`Label::Component`] edge carries a component payload,
//! a [`Label::Tag`] edge carries nothing, and [`Label::IsA`] is the reserved
//! inheritance label.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Type;
use crate::value::Value;

/// Key of a component: a kind plus an optional name.
///
/// The name distinguishes several co-existing components of the same kind
/// on one entity.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentKey {
    /// Optional disambiguating name.
    pub name: Option<Value>,
    /// Component kind.
    pub kind: Type,
}

impl ComponentKey {
    /// Key for the unnamed component of `kind`.
    #[must_use]
    pub const fn of(kind: Type) -> Self {
        Self { name: None, kind }
    }

    /// Key for the component of `kind` called `name`.
    #[must_use]
    pub fn named(name: impl Into<Value>, kind: Type) -> Self {
        Self {
            name: Some(name.into()),
            kind,
        }
    }

    /// Key under which an unnamed `value` is stored when no kind is given.
    #[must_use]
    pub fn for_value(value: &Value) -> Self {
        Self::of(value.value_type())
    }
}

impl From<Type> for ComponentKey {
    fn from(kind: Type) -> Self {
        Self::of(kind)
    }
}

impl fmt::Debug for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "({name:?}, {:?})", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Relation label.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Label {
    /// The reserved inheritance label.
    IsA,
    /// A plain label without payload.
    Tag(Value),
    /// A label whose edges carry a component value.
    Component(ComponentKey),
}

impl Label {
    /// Plain label from anything convertible to a value.
    #[must_use]
    pub fn tag(tag: impl Into<Value>) -> Self {
        Self::Tag(tag.into())
    }

    /// Returns the component key if this label carries payloads.
    #[must_use]
    pub const fn as_component(&self) -> Option<&ComponentKey> {
        match self {
            Self::Component(key) => Some(key),
            _ => None,
        }
    }

    /// Returns true for the inheritance label.
    #[must_use]
    pub const fn is_inheritance(&self) -> bool {
        matches!(self, Self::IsA)
    }
}

impl From<ComponentKey> for Label {
    fn from(key: ComponentKey) -> Self {
        Self::Component(key)
    }
}

impl From<&str> for Label {
    fn from(tag: &str) -> Self {
        Self::Tag(Value::from(tag))
    }
}

impl From<Value> for Label {
    fn from(tag: Value) -> Self {
        Self::Tag(tag)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsA => write!(f, "IsA"),
            Self::Tag(tag) => write!(f, "{tag:?}"),
            Self::Component(key) => write!(f, "{key:?}"),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identity of a version counter.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexKey {
    /// Component index for one key.
    Component(ComponentKey),
    /// Tag index for one tag.
    Tag(Value),
    /// Relation index for one label.
    Relation(Label),
    /// Set of entities holding any data at all.
    Population,
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(key) => write!(f, "component {key:?}"),
            Self::Tag(tag) => write!(f, "tag {tag:?}"),
            Self::Relation(label) => write!(f, "relation {label:?}"),
            Self::Population => write!(f, "population"),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
