//! Entity handles and caller-facing identities.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Entity identifier with generational index for stale reference detection.
///
/// The generation counter increments when an entity slot is reused after
/// destruction, so a handle that outlived its entity is detectable instead
/// of silently aliasing the slot's next occupant.
///
/// # Layout
/// - `index`: 64-bit slot index in the identity table
/// - `generation`: 32-bit generation counter
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId {
    /// Index into the identity table.
    pub index: u64,
    /// Generation counter for stale reference detection.
    pub generation: u32,
}

impl EntityId {
    /// Creates a new entity ID with the given index and generation.
    #[must_use]
    pub const fn new(index: u64, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns a sentinel value representing "no entity".
    #[must_use]
    pub const fn null() -> Self {
        Self {
            index: u64::MAX,
            generation: 0,
        }
    }

    /// Returns true if this is the null sentinel value.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == u64::MAX
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "EntityId(null)")
        } else {
            write!(f, "EntityId({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({})", self.index)
        }
    }
}

/// Caller-facing identity of an entity.
///
/// Every uid maps to exactly one live [`EntityId`] per registry.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Uid {
    /// The single global entity of a registry.
    Global,
    /// A caller-supplied identity.
    Value(Value),
    /// An identity issued by the registry, distinct from every other.
    Unique(u64),
}

impl Uid {
    /// Returns true for the global sentinel.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "Uid(global)"),
            Self::Value(v) => write!(f, "Uid({v:?})"),
            Self::Unique(n) => write!(f, "Uid(#{n})"),
        }
    }
}

impl From<Value> for Uid {
    fn from(value: Value) -> Self {
        if value.is_nil() {
            Self::Global
        } else {
            Self::Value(value)
        }
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self::Value(Value::from(s))
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self::Value(Value::from(s))
    }
}

impl From<i64> for Uid {
    fn from(n: i64) -> Self {
        Self::Value(Value::Int(n))
    }
}
