//! Inheritance resolution over is-a edges.
//!
//! The resolver walks the lineage of an entity breadth-first: the entity
//! itself, then the targets of each traversal label (labels in the order
//! given, targets in edge insertion order), then their targets, and so on.
//! Nothing is materialized; every lookup walks the current edges.

use std::collections::{HashMap, HashSet, VecDeque};

use entwine_foundation::{EntityId, Error, Label, Result};

use crate::relation::RelationIndex;

/// Walks lineages through a [`RelationIndex`].
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    relations: &'a RelationIndex,
    traverse: &'a [Label],
    max_depth: Option<usize>,
}

/// Outcome of one walk: the first hit and the first cycle seen.
struct Walk<T> {
    found: Option<T>,
    cycle: Option<(EntityId, Vec<EntityId>)>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver following `traverse` labels without a depth bound.
    #[must_use]
    pub fn new(relations: &'a RelationIndex, traverse: &'a [Label]) -> Self {
        Self {
            relations,
            traverse,
            max_depth: None,
        }
    }

    /// Bounds the walk to `max_depth` steps from the start entity.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the first value `f` produces along the lineage of `start`.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if `f` produced nothing and the lineage
    /// contains a cycle.
    pub fn find_map<T>(
        &self,
        start: EntityId,
        f: impl FnMut(EntityId) -> Option<T>,
    ) -> Result<Option<T>> {
        let walk = self.walk(start, f);
        match (walk.found, walk.cycle) {
            (Some(found), _) => Ok(Some(found)),
            (None, Some((entity, path))) => Err(Error::cycle_detected(entity, path)),
            (None, None) => Ok(None),
        }
    }

    /// Returns true if any entity in the lineage of `start` satisfies `f`.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` under the same conditions as [`find_map`](Self::find_map).
    pub fn any(&self, start: EntityId, mut f: impl FnMut(EntityId) -> bool) -> Result<bool> {
        Ok(self.find_map(start, |e| f(e).then_some(()))?.is_some())
    }

    /// The lineage of `start`, closest first, starting with `start` itself.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if the lineage contains a cycle.
    pub fn lineage(&self, start: EntityId) -> Result<Vec<EntityId>> {
        let mut lineage = Vec::new();
        let walk = self.walk(start, |e| {
            lineage.push(e);
            None::<()>
        });
        match walk.cycle {
            Some((entity, path)) => Err(Error::cycle_detected(entity, path)),
            None => Ok(lineage),
        }
    }

    /// The lineage of `start`, closest first, ignoring cycles.
    #[must_use]
    pub fn lineage_lenient(&self, start: EntityId) -> Vec<EntityId> {
        let mut lineage = Vec::new();
        self.walk(start, |e| {
            lineage.push(e);
            None::<()>
        });
        lineage
    }

    /// Returns true if `to` is `from` or reachable from it via traversal labels.
    #[must_use]
    pub fn can_reach(&self, from: EntityId, to: EntityId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(entity) = queue.pop_front() {
            for label in self.traverse {
                for next in self.relations.targets(entity, label) {
                    if next == to {
                        return true;
                    }
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        false
    }

    fn walk<T>(&self, start: EntityId, mut f: impl FnMut(EntityId) -> Option<T>) -> Walk<T> {
        let mut visited = HashSet::from([start]);
        let mut parents: HashMap<EntityId, EntityId> = HashMap::new();
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut cycle = None;

        while let Some((entity, depth)) = queue.pop_front() {
            if let Some(found) = f(entity) {
                return Walk {
                    found: Some(found),
                    cycle,
                };
            }
            if self.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }

            for label in self.traverse {
                for next in self.relations.targets(entity, label) {
                    if visited.insert(next) {
                        parents.insert(next, entity);
                        queue.push_back((next, depth + 1));
                    } else if cycle.is_none() && self.can_reach(next, entity) {
                        let path = path_to(&parents, start, entity, next);
                        tracing::trace!(?start, ?next, ?path, "inheritance cycle");
                        cycle = Some((next, path));
                    }
                }
            }
        }

        Walk { found: None, cycle }
    }
}

/// Path from `start` to `entity` along recorded parents, then on to `next`.
fn path_to(
    parents: &HashMap<EntityId, EntityId>,
    start: EntityId,
    entity: EntityId,
    next: EntityId,
) -> Vec<EntityId> {
    let mut path = vec![entity];
    let mut current = entity;
    while current != start {
        match parents.get(&current) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    path.reverse();
    path.push(next);
    path
}
