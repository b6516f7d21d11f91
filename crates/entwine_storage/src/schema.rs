//! Relation schemas.
//!
//! A schema fixes how a relation label behaves: how many targets one origin
//! may hold, and what happens to origins when a target is destroyed. Labels
//! without a registered schema behave like [`RelationSchema::new`].

use entwine_foundation::Label;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Schema definition for a relation label.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelationSchema {
    /// Label this schema governs.
    pub label: Label,
    /// Target multiplicity per origin.
    pub multiplicity: Multiplicity,
    /// What happens to origins when a target is destroyed.
    pub on_destroy: OnDestroy,
}

impl RelationSchema {
    /// Creates a multi-target schema that drops edges on destroy.
    #[must_use]
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            multiplicity: Multiplicity::Multi,
            on_destroy: OnDestroy::Remove,
        }
    }

    /// Sets the multiplicity.
    #[must_use]
    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Sets the destroy policy.
    #[must_use]
    pub fn with_on_destroy(mut self, on_destroy: OnDestroy) -> Self {
        self.on_destroy = on_destroy;
        self
    }

    /// Returns true if an origin holds at most one target.
    #[must_use]
    pub fn is_exclusive(&self) -> bool {
        self.multiplicity == Multiplicity::Exclusive
    }
}

/// Number of targets an origin may hold under one label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Multiplicity {
    /// At most one target; adding a target replaces the previous one.
    Exclusive,
    /// Any number of targets.
    #[default]
    Multi,
}

/// What happens to origins when the target of an edge is destroyed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OnDestroy {
    /// Remove the edge.
    #[default]
    Remove,
    /// Destroy the origin as well.
    Cascade,
}
