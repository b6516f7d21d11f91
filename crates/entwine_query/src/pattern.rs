//! Relation patterns.
//!
//! A pattern selects one end of an edge:
//! - `(label, target)` selects origins of edges to `target`
//! - `(origin, label, nil)` selects targets of edges from `origin`
//!
//! The fixed end is an entity, a wildcard, or a nested [`Query`] whose
//! results all count as matches for that position.

use entwine_foundation::{EntityId, Error, Label, Result};

use crate::query::Query;

/// The fixed end of a relation pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Exactly this entity.
    Entity(EntityId),
    /// Any entity.
    Any,
    /// Any entity matched by the query.
    Query(Box<Query>),
}

impl From<EntityId> for Target {
    fn from(entity: EntityId) -> Self {
        Self::Entity(entity)
    }
}

impl From<Query> for Target {
    fn from(query: Query) -> Self {
        Self::Query(Box::new(query))
    }
}

/// A relation atom of a query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RelationPattern {
    /// Entities with an edge `-label-> target`.
    Origins {
        /// Edge label.
        label: Label,
        /// Constraint on the edge target.
        target: Target,
    },
    /// Entities targeted by an edge `origin -label->`.
    Targets {
        /// Constraint on the edge origin.
        origin: Target,
        /// Edge label.
        label: Label,
    },
}

impl RelationPattern {
    /// Pattern matching origins of `-label-> target`.
    #[must_use]
    pub fn origins(label: impl Into<Label>, target: impl Into<Target>) -> Self {
        Self::Origins {
            label: label.into(),
            target: target.into(),
        }
    }

    /// Pattern matching targets of `origin -label->`.
    #[must_use]
    pub fn targets(origin: impl Into<Target>, label: impl Into<Label>) -> Self {
        Self::Targets {
            origin: origin.into(),
            label: label.into(),
        }
    }

    /// Parses the tuple form: `[label, target]` or `[origin, label, nil]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for any other arity or a term in the wrong
    /// position.
    pub fn from_terms(terms: &[Term]) -> Result<Self> {
        match terms {
            [Term::Label(label), target] => Ok(Self::Origins {
                label: label.clone(),
                target: target.as_target(1)?,
            }),
            [origin, Term::Label(label), Term::Nil] => Ok(Self::Targets {
                origin: origin.as_target(0)?,
                label: label.clone(),
            }),
            [_, _] => Err(Error::invalid_query(
                "two-term relation pattern must be (label, target)",
            )),
            [_, _, _] => Err(Error::invalid_query(
                "three-term relation pattern must be (origin, label, nil)",
            )),
            _ => Err(Error::invalid_query(format!(
                "relation pattern needs 2 or 3 terms, got {}",
                terms.len()
            ))),
        }
    }

    /// The label this pattern matches on.
    #[must_use]
    pub fn label(&self) -> &Label {
        match self {
            Self::Origins { label, .. } | Self::Targets { label, .. } => label,
        }
    }

    /// The nested query, if the fixed end is one.
    #[must_use]
    pub fn nested(&self) -> Option<&Query> {
        match self {
            Self::Origins { target: end, .. } | Self::Targets { origin: end, .. } => match end {
                Target::Query(query) => Some(query),
                _ => None,
            },
        }
    }
}

/// One position of a tuple-form relation pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// A concrete entity.
    Entity(EntityId),
    /// The wildcard.
    Any,
    /// A relation label.
    Label(Label),
    /// A nested query.
    Query(Query),
    /// The trailing marker of the `(origin, label, nil)` form.
    Nil,
}

impl Term {
    fn as_target(&self, position: usize) -> Result<Target> {
        match self {
            Self::Entity(entity) => Ok(Target::Entity(*entity)),
            Self::Any => Ok(Target::Any),
            Self::Query(query) => Ok(Target::Query(Box::new(query.clone()))),
            Self::Label(label) => Err(Error::invalid_query(format!(
                "label {label:?} at position {position} where an entity, wildcard or query belongs"
            ))),
            Self::Nil => Err(Error::invalid_query(format!(
                "nil at position {position} where an entity, wildcard or query belongs"
            ))),
        }
    }
}

impl From<EntityId> for Term {
    fn from(entity: EntityId) -> Self {
        Self::Entity(entity)
    }
}

impl From<Label> for Term {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}

impl From<Query> for Term {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}
