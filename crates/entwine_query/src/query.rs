//! Query construction.
//!
//! A [`Query`] is an immutable tree of [`Node`]s built from three clause
//! kinds:
//! - `all_of`: every atom must match
//! - `any_of`: at least one atom of the clause must match
//! - `none_of`: no atom may match
//!
//! Atoms are component keys, tags, and [`RelationPattern`]s. Unless a
//! [`Terms`] group says otherwise, every atom also matches entities that
//! inherit the attribute through `IsA` edges.
//!
//! Queries are values: two structurally equal queries hash and compare
//! equal, which is what the engine's cache keys on.

use entwine_foundation::{ComponentKey, Error, Label, LtSet, Result, Value};

use crate::pattern::RelationPattern;

// =============================================================================
// Query Tree
// =============================================================================

/// One node of a query tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// Entities holding the component locally.
    Component(ComponentKey),
    /// Entities holding the tag locally.
    Tag(Value),
    /// Entities at the selected end of matching edges.
    Relation(RelationPattern),
    /// The inner node's matches plus everything inheriting from them.
    Traverse {
        /// Node whose matches are propagated.
        inner: Box<Node>,
        /// Labels followed from descendant to ancestor.
        via: Vec<Label>,
        /// Maximum propagation steps (`None` = unbounded).
        depth: Option<usize>,
    },
    /// Intersection of `all_of`, minus the union of `none_of`.
    ///
    /// An empty `all_of` stands for every populated entity.
    And {
        /// Required nodes.
        all_of: LtSet<Node>,
        /// Forbidden nodes.
        none_of: LtSet<Node>,
    },
    /// Union of the nodes; empty matches nothing.
    Or {
        /// Alternative nodes.
        any_of: LtSet<Node>,
    },
}

/// A declarative query over a registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Query {
    all_of: LtSet<Node>,
    none_of: LtSet<Node>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    /// Creates a query matching every populated entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            all_of: LtSet::new(),
            none_of: LtSet::new(),
        }
    }

    /// Requires every atom of `terms`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if an atom is also forbidden.
    pub fn all_of(self, terms: Terms) -> Result<Self> {
        let atoms = terms.atoms();
        self.merge(atoms, LtSet::new())
    }

    /// Requires at least one atom of `terms`. An empty group adds nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the alternative is also forbidden.
    pub fn any_of(self, terms: Terms) -> Result<Self> {
        let any_of = terms.atoms();
        if any_of.is_empty() {
            return Ok(self);
        }
        self.merge(LtSet::new().insert(Node::Or { any_of }), LtSet::new())
    }

    /// Forbids every atom of `terms`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if an atom is also required.
    pub fn none_of(self, terms: Terms) -> Result<Self> {
        let atoms = terms.atoms();
        self.merge(LtSet::new(), atoms)
    }

    /// Combines both queries' clauses.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if the result requires and forbids the same atom.
    pub fn and(self, other: &Query) -> Result<Self> {
        self.merge(other.all_of.clone(), other.none_of.clone())
    }

    /// Returns true if this query has no clauses.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.all_of.is_empty() && self.none_of.is_empty()
    }

    /// The query as a single tree node.
    #[must_use]
    pub fn node(&self) -> Node {
        Node::And {
            all_of: self.all_of.clone(),
            none_of: self.none_of.clone(),
        }
    }

    fn merge(self, all_of: LtSet<Node>, none_of: LtSet<Node>) -> Result<Self> {
        let all_of = self.all_of.union(&all_of);
        let none_of = self.none_of.union(&none_of);
        let conflict = all_of.intersection(&none_of);
        if let Some(node) = conflict.iter().next() {
            return Err(Error::invalid_query(format!(
                "{node:?} is both required and forbidden"
            )));
        }
        Ok(Self { all_of, none_of })
    }
}

// =============================================================================
// Terms
// =============================================================================

/// A group of atoms sharing one inheritance setting.
///
/// ```
/// use entwine_foundation::{ComponentKey, Type};
/// use entwine_query::{Query, Terms};
///
/// let hp = ComponentKey::named("hp", Type::Int);
/// let query = Query::new()
///     .all_of(Terms::new().component(hp).tag("Monster"))?
///     .none_of(Terms::new().tag("Dead").depth(0))?;
/// # Ok::<(), entwine_foundation::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terms {
    components: Vec<ComponentKey>,
    tags: Vec<Value>,
    relations: Vec<RelationPattern>,
    traverse: Vec<Label>,
    depth: Option<usize>,
}

impl Default for Terms {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            tags: Vec::new(),
            relations: Vec::new(),
            traverse: vec![Label::IsA],
            depth: None,
        }
    }
}

impl Terms {
    /// Creates an empty group that inherits through `IsA`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component atom.
    #[must_use]
    pub fn component(mut self, key: ComponentKey) -> Self {
        self.components.push(key);
        self
    }

    /// Adds several component atoms.
    #[must_use]
    pub fn components(mut self, keys: impl IntoIterator<Item = ComponentKey>) -> Self {
        self.components.extend(keys);
        self
    }

    /// Adds a tag atom.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<Value>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds several tag atoms.
    #[must_use]
    pub fn tags<T: Into<Value>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds a relation atom.
    #[must_use]
    pub fn relation(mut self, pattern: RelationPattern) -> Self {
        self.relations.push(pattern);
        self
    }

    /// Adds several relation atoms.
    #[must_use]
    pub fn relations(mut self, patterns: impl IntoIterator<Item = RelationPattern>) -> Self {
        self.relations.extend(patterns);
        self
    }

    /// Sets the labels inheritance follows. Empty means local matches only.
    #[must_use]
    pub fn traverse(mut self, labels: impl IntoIterator<Item = Label>) -> Self {
        self.traverse = labels.into_iter().collect();
        self
    }

    /// Bounds inheritance to `depth` steps. Zero means local matches only.
    #[must_use]
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Returns true if the group has no atoms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.tags.is_empty() && self.relations.is_empty()
    }

    fn atoms(self) -> LtSet<Node> {
        let local = self.traverse.is_empty() || self.depth == Some(0);
        let wrap = |node: Node| {
            if local {
                node
            } else {
                Node::Traverse {
                    inner: Box::new(node),
                    via: self.traverse.clone(),
                    depth: self.depth,
                }
            }
        };

        self.components
            .iter()
            .cloned()
            .map(Node::Component)
            .chain(self.tags.iter().cloned().map(Node::Tag))
            .chain(self.relations.iter().cloned().map(Node::Relation))
            .map(wrap)
            .collect()
    }
}
