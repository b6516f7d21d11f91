//! Query evaluation with version-checked memoization.
//!
//! Every node of a query tree is evaluated bottom-up against the
//! registry's reverse indices. Each result is cached under the node's
//! structural identity together with the versions of every index the node
//! read. A later evaluation of an equal node reuses the cached set while
//! those versions are unchanged.

use std::collections::{HashMap, HashSet};

use entwine_foundation::{ComponentKey, EntityId, Error, IndexKey, Label, LtSet, Result, Value};
use entwine_storage::{Registry, RegistryId, Resolver};

use crate::config::QueryConfig;
use crate::pattern::{RelationPattern, Target};
use crate::query::{Node, Query, Terms};

// =============================================================================
// Cache
// =============================================================================

/// A cached node result and the versions it was computed at.
#[derive(Clone, Debug)]
struct CacheEntry {
    result: LtSet<EntityId>,
    versions: Vec<(IndexKey, u64)>,
}

impl CacheEntry {
    fn is_current(&self, registry: &Registry) -> bool {
        self.versions
            .iter()
            .all(|(key, version)| registry.version(key) == *version)
    }
}

/// Counters describing cache behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Node results served from the cache.
    pub hits: u64,
    /// Node results computed from the indices.
    pub recomputations: u64,
}

/// One column of a shaped row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    /// The matched entity, as [`Value::EntityRef`].
    Entity,
    /// The entity's component value, resolved through inheritance.
    Component(ComponentKey),
}

// =============================================================================
// Engine
// =============================================================================

/// Evaluates queries against a registry and caches their results.
///
/// An engine is bound to one registry at a time. Evaluating against a
/// different registry drops the cache.
#[derive(Debug, Default)]
pub struct QueryEngine {
    config: QueryConfig,
    registry: Option<RegistryId>,
    cache: HashMap<Node, CacheEntry>,
    stats: QueryStats,
}

impl QueryEngine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Returns the cache counters.
    #[must_use]
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Number of cached node results.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Returns the set of entities matching `query`.
    pub fn get_entities(&mut self, registry: &Registry, query: &Query) -> LtSet<EntityId> {
        self.bind(registry);
        self.eval(registry, &query.node())
    }

    /// Returns true if any entity matches `query`.
    ///
    /// Stops at the first match unless a current cached result exists.
    /// Nested queries are evaluated once per call, not once per entity.
    pub fn exists(&mut self, registry: &Registry, query: &Query) -> bool {
        self.bind(registry);
        let node = query.node();
        if let Some(entry) = self.cached(registry, &node) {
            return !entry.result.is_empty();
        }
        let mut matcher = Matcher {
            engine: self,
            registry,
            nested: HashMap::new(),
        };
        registry
            .iter_entities()
            .any(|entity| matcher.matches(&node, entity))
    }

    /// Returns the number of entities matching `query`.
    pub fn count(&mut self, registry: &Registry, query: &Query) -> usize {
        self.get_entities(registry, query).len()
    }

    /// Returns one row per matching entity, ordered by entity handle.
    ///
    /// Component columns are added to the query as `all_of` atoms that
    /// inherit the way the registry is configured to, so every row has a
    /// value in every cell and cells agree with [`Registry::component`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if a column's component is forbidden by the
    /// query, or `InvariantViolation` if a matched entity has no value for
    /// a component column.
    pub fn rows(
        &mut self,
        registry: &Registry,
        query: &Query,
        shape: &[Column],
    ) -> Result<Vec<Vec<Value>>> {
        let keys: Vec<ComponentKey> = shape
            .iter()
            .filter_map(|column| match column {
                Column::Component(key) => Some(key.clone()),
                Column::Entity => None,
            })
            .collect();
        let config = registry.config();
        let mut terms = Terms::new()
            .traverse(config.traverse.iter().cloned())
            .components(keys);
        if let Some(depth) = config.max_inheritance_depth {
            terms = terms.depth(depth);
        }
        let query = query.clone().all_of(terms)?;

        let mut entities: Vec<EntityId> = self.get_entities(registry, &query).into_iter().collect();
        entities.sort_unstable();

        let resolver = registry.resolver();
        entities
            .into_iter()
            .map(|entity| {
                let lineage = resolver.lineage_lenient(entity);
                shape
                    .iter()
                    .map(|column| match column {
                        Column::Entity => Ok(Value::EntityRef(entity)),
                        Column::Component(key) => lineage
                            .iter()
                            .find_map(|e| registry.component_index().get(*e, key))
                            .cloned()
                            .ok_or_else(|| {
                                Error::invariant_violation(format!(
                                    "{entity:?} matched {key} but resolves no value"
                                ))
                            }),
                    })
                    .collect()
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    fn bind(&mut self, registry: &Registry) {
        let id = registry.id();
        if self.registry != Some(id) {
            if !self.cache.is_empty() {
                tracing::debug!(?id, dropped = self.cache.len(), "query cache rebound");
            }
            self.cache.clear();
            self.registry = Some(id);
        }
    }

    fn cached(&self, registry: &Registry, node: &Node) -> Option<&CacheEntry> {
        if !self.config.cache_enabled {
            return None;
        }
        self.cache.get(node).filter(|entry| entry.is_current(registry))
    }

    fn eval(&mut self, registry: &Registry, node: &Node) -> LtSet<EntityId> {
        if let Some(entry) = self.cached(registry, node) {
            let result = entry.result.clone();
            self.stats.hits += 1;
            tracing::trace!(?node, len = result.len(), "query cache hit");
            return result;
        }

        tracing::trace!(?node, "query cache miss");
        let result = self.compute(registry, node);
        self.stats.recomputations += 1;

        if self.config.cache_enabled {
            if self.cache.len() >= self.config.max_cached_queries {
                tracing::debug!(len = self.cache.len(), "query cache full, clearing");
                self.cache.clear();
            }
            let mut keys = Vec::new();
            dependencies(node, &mut keys);
            let versions = keys
                .into_iter()
                .map(|key| {
                    let version = registry.version(&key);
                    (key, version)
                })
                .collect();
            self.cache.insert(
                node.clone(),
                CacheEntry {
                    result: result.clone(),
                    versions,
                },
            );
        }
        result
    }

    fn compute(&mut self, registry: &Registry, node: &Node) -> LtSet<EntityId> {
        match node {
            Node::Component(key) => registry.component_index().entities_with(key).collect(),
            Node::Tag(tag) => registry.tag_index().entities_with(tag).collect(),
            Node::Relation(pattern) => self.relation(registry, pattern),
            Node::Traverse { inner, via, depth } => {
                let matched = self.eval(registry, inner);
                propagate(registry, matched, via, *depth)
            }
            Node::And { all_of, none_of } => {
                let mut result = if all_of.is_empty() {
                    registry.entities().into_iter().collect()
                } else {
                    self.intersect(registry, all_of)
                };
                for forbidden in none_of.iter() {
                    if result.is_empty() {
                        break;
                    }
                    result = result.difference(&self.eval(registry, forbidden));
                }
                result
            }
            Node::Or { any_of } => any_of
                .iter()
                .fold(LtSet::new(), |acc, n| acc.union(&self.eval(registry, n))),
        }
    }

    /// Intersects smallest sets first.
    fn intersect(&mut self, registry: &Registry, nodes: &LtSet<Node>) -> LtSet<EntityId> {
        let mut sets: Vec<LtSet<EntityId>> = nodes.iter().map(|n| self.eval(registry, n)).collect();
        sets.sort_by_key(LtSet::len);
        let mut sets = sets.into_iter();
        let Some(mut result) = sets.next() else {
            return LtSet::new();
        };
        for set in sets {
            if result.is_empty() {
                break;
            }
            result = result.intersection(&set);
        }
        result
    }

    fn relation(&mut self, registry: &Registry, pattern: &RelationPattern) -> LtSet<EntityId> {
        let relations = registry.relation_index();
        match pattern {
            RelationPattern::Origins { label, target } => match target {
                Target::Entity(target) => relations.origins(label, *target).collect(),
                Target::Any => relations.origins_with(label).collect(),
                Target::Query(query) => {
                    let targets = self.eval(registry, &query.node());
                    targets
                        .iter()
                        .flat_map(|t| relations.origins(label, *t))
                        .collect()
                }
            },
            RelationPattern::Targets { origin, label } => match origin {
                Target::Entity(origin) => relations.targets(*origin, label).into_iter().collect(),
                Target::Any => relations.targets_with(label).collect(),
                Target::Query(query) => {
                    let origins = self.eval(registry, &query.node());
                    origins
                        .iter()
                        .flat_map(|o| relations.targets(*o, label))
                        .collect()
                }
            },
        }
    }
}

/// Adds every entity reaching a matched entity through `via` edges.
///
/// Each round follows edges backwards from the entities found in the
/// previous round, so every entity is expanded at most once.
fn propagate(
    registry: &Registry,
    matched: LtSet<EntityId>,
    via: &[Label],
    depth: Option<usize>,
) -> LtSet<EntityId> {
    let relations = registry.relation_index();
    let ancestors: HashSet<EntityId> = via
        .iter()
        .flat_map(|label| relations.targets_with(label))
        .collect();

    let mut cumulative: HashSet<EntityId> = matched.iter().copied().collect();
    let mut frontier: Vec<EntityId> = cumulative
        .iter()
        .copied()
        .filter(|e| ancestors.contains(e))
        .collect();
    let mut steps = 0;

    while !frontier.is_empty() && depth.is_none_or(|max| steps < max) {
        let mut next = Vec::new();
        for entity in frontier {
            for label in via {
                for origin in relations.origins(label, entity) {
                    if cumulative.insert(origin) {
                        next.push(origin);
                    }
                }
            }
        }
        frontier = next;
        steps += 1;
    }

    cumulative.into_iter().collect()
}

/// Collects the index keys a node's result depends on.
fn dependencies(node: &Node, keys: &mut Vec<IndexKey>) {
    match node {
        Node::Component(key) => keys.push(IndexKey::Component(key.clone())),
        Node::Tag(tag) => keys.push(IndexKey::Tag(tag.clone())),
        Node::Relation(pattern) => {
            keys.push(IndexKey::Relation(pattern.label().clone()));
            if let Some(query) = pattern.nested() {
                dependencies(&query.node(), keys);
            }
        }
        Node::Traverse { inner, via, .. } => {
            dependencies(inner, keys);
            keys.extend(via.iter().cloned().map(IndexKey::Relation));
        }
        Node::And { all_of, none_of } => {
            if all_of.is_empty() {
                keys.push(IndexKey::Population);
            }
            for child in all_of.iter().chain(none_of.iter()) {
                dependencies(child, keys);
            }
        }
        Node::Or { any_of } => {
            for child in any_of.iter() {
                dependencies(child, keys);
            }
        }
    }
}

/// Per-entity matching for `exists`.
///
/// Nested query positions are resolved to sets through the engine once and
/// reused for every candidate entity.
struct Matcher<'e, 'r> {
    engine: &'e mut QueryEngine,
    registry: &'r Registry,
    nested: HashMap<Node, LtSet<EntityId>>,
}

impl Matcher<'_, '_> {
    fn nested(&mut self, query: &Query) -> LtSet<EntityId> {
        let node = query.node();
        if let Some(set) = self.nested.get(&node) {
            return set.clone();
        }
        let set = self.engine.eval(self.registry, &node);
        self.nested.insert(node, set.clone());
        set
    }

    /// Returns true if `entity` matches `node`, without building sets for
    /// anything but nested queries.
    fn matches(&mut self, node: &Node, entity: EntityId) -> bool {
        let registry = self.registry;
        let relations = registry.relation_index();
        match node {
            Node::Component(key) => registry.component_index().contains(entity, key),
            Node::Tag(tag) => registry.tag_index().contains(entity, tag),
            Node::Relation(RelationPattern::Origins { label, target }) => match target {
                Target::Entity(target) => relations.has_edge(entity, label, *target),
                Target::Any => relations.target_count(entity, label) > 0,
                Target::Query(query) => {
                    let matched = self.nested(query);
                    relations
                        .targets(entity, label)
                        .into_iter()
                        .any(|t| matched.contains(&t))
                }
            },
            Node::Relation(RelationPattern::Targets { origin, label }) => match origin {
                Target::Entity(origin) => relations.has_edge(*origin, label, entity),
                Target::Any => relations.origins(label, entity).next().is_some(),
                Target::Query(query) => {
                    let matched = self.nested(query);
                    relations
                        .origins(label, entity)
                        .any(|o| matched.contains(&o))
                }
            },
            Node::Traverse { inner, via, depth } => Resolver::new(relations, via)
                .with_max_depth(*depth)
                .lineage_lenient(entity)
                .into_iter()
                .any(|e| self.matches(inner, e)),
            Node::And { all_of, none_of } => {
                (!all_of.is_empty() || registry.is_populated(entity))
                    && all_of.iter().all(|n| self.matches(n, entity))
                    && !none_of.iter().any(|n| self.matches(n, entity))
            }
            Node::Or { any_of } => any_of.iter().any(|n| self.matches(n, entity)),
        }
    }
}
