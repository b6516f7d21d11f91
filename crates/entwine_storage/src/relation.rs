//! Relation storage with bidirectional indices.
//!
//! Edges connect an origin to a target under a [`Label`]. Every edge is
//! recorded in both directions, and per-label counters answer wildcard
//! lookups ("every origin with any `OrbitOf` target") without a scan.
//! All mutations update every structure before returning.

use std::collections::{HashMap, HashSet};

use entwine_foundation::{EntityId, Error, Label, Result, Value};

use crate::schema::RelationSchema;

/// Data carried by one edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Insertion sequence number; fixes target order and inheritance precedence.
    pub seq: u64,
    /// Component payload, for component-keyed labels.
    pub payload: Option<Value>,
}

/// Stores relation edges between entities.
///
/// Maintains:
/// - Forward: origin -> label -> target -> edge
/// - Reverse: target -> label -> origins
/// - Per label: origin -> target count, target -> origin count
#[derive(Clone, Debug, Default)]
pub struct RelationIndex {
    schemas: HashMap<Label, RelationSchema>,
    forward: HashMap<EntityId, HashMap<Label, HashMap<EntityId, Edge>>>,
    reverse: HashMap<EntityId, HashMap<Label, HashSet<EntityId>>>,
    origins_by_label: HashMap<Label, HashMap<EntityId, usize>>,
    targets_by_label: HashMap<Label, HashMap<EntityId, usize>>,
    next_seq: u64,
}

fn increment(counts: &mut HashMap<Label, HashMap<EntityId, usize>>, label: &Label, entity: EntityId) {
    *counts
        .entry(label.clone())
        .or_default()
        .entry(entity)
        .or_insert(0) += 1;
}

fn decrement(counts: &mut HashMap<Label, HashMap<EntityId, usize>>, label: &Label, entity: EntityId) {
    let Some(per_entity) = counts.get_mut(label) else {
        return;
    };
    if let Some(count) = per_entity.get_mut(&entity) {
        *count -= 1;
        if *count == 0 {
            per_entity.remove(&entity);
        }
    }
    if per_entity.is_empty() {
        counts.remove(label);
    }
}

impl RelationIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a relation schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaConflict` if the label already has a schema.
    pub fn register_schema(&mut self, schema: RelationSchema) -> Result<()> {
        if self.schemas.contains_key(&schema.label) {
            return Err(Error::schema_conflict(schema.label.to_string()));
        }
        self.schemas.insert(schema.label.clone(), schema);
        Ok(())
    }

    /// Gets the schema registered for a label.
    #[must_use]
    pub fn schema(&self, label: &Label) -> Option<&RelationSchema> {
        self.schemas.get(label)
    }

    /// Iterates over registered schemas.
    pub fn schemas(&self) -> impl Iterator<Item = &RelationSchema> {
        self.schemas.values()
    }

    /// Inserts an edge, or replaces the payload of an existing one.
    ///
    /// Returns the previous edge if there was one. A replaced edge keeps its
    /// sequence number.
    pub fn insert(
        &mut self,
        origin: EntityId,
        label: Label,
        target: EntityId,
        payload: Option<Value>,
    ) -> Option<Edge> {
        let targets = self
            .forward
            .entry(origin)
            .or_default()
            .entry(label.clone())
            .or_default();

        if let Some(edge) = targets.get_mut(&target) {
            let previous = edge.clone();
            edge.payload = payload;
            return Some(previous);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        targets.insert(target, Edge { seq, payload });

        self.reverse
            .entry(target)
            .or_default()
            .entry(label.clone())
            .or_default()
            .insert(origin);
        increment(&mut self.origins_by_label, &label, origin);
        increment(&mut self.targets_by_label, &label, target);
        None
    }

    /// Removes an edge, returning it if it existed.
    pub fn remove(&mut self, origin: EntityId, label: &Label, target: EntityId) -> Option<Edge> {
        let by_label = self.forward.get_mut(&origin)?;
        let targets = by_label.get_mut(label)?;
        let edge = targets.remove(&target)?;
        if targets.is_empty() {
            by_label.remove(label);
        }
        if by_label.is_empty() {
            self.forward.remove(&origin);
        }

        if let Some(by_label) = self.reverse.get_mut(&target) {
            if let Some(origins) = by_label.get_mut(label) {
                origins.remove(&origin);
                if origins.is_empty() {
                    by_label.remove(label);
                }
            }
            if by_label.is_empty() {
                self.reverse.remove(&target);
            }
        }

        decrement(&mut self.origins_by_label, label, origin);
        decrement(&mut self.targets_by_label, label, target);
        Some(edge)
    }

    /// Targets of `(origin, label)` in insertion order.
    #[must_use]
    pub fn targets(&self, origin: EntityId, label: &Label) -> Vec<EntityId> {
        let Some(targets) = self.forward.get(&origin).and_then(|m| m.get(label)) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = targets.iter().map(|(t, edge)| (edge.seq, *t)).collect();
        ordered.sort_unstable();
        ordered.into_iter().map(|(_, t)| t).collect()
    }

    /// Number of targets of `(origin, label)`.
    #[must_use]
    pub fn target_count(&self, origin: EntityId, label: &Label) -> usize {
        self.origins_by_label
            .get(label)
            .and_then(|m| m.get(&origin))
            .copied()
            .unwrap_or(0)
    }

    /// Gets one edge.
    #[must_use]
    pub fn edge(&self, origin: EntityId, label: &Label, target: EntityId) -> Option<&Edge> {
        self.forward.get(&origin)?.get(label)?.get(&target)
    }

    /// Checks if an edge exists.
    #[must_use]
    pub fn has_edge(&self, origin: EntityId, label: &Label, target: EntityId) -> bool {
        self.edge(origin, label, target).is_some()
    }

    /// Iterates origins of `(label, target)`.
    pub fn origins(&self, label: &Label, target: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.reverse
            .get(&target)
            .and_then(|m| m.get(label))
            .into_iter()
            .flat_map(|origins| origins.iter().copied())
    }

    /// Iterates every origin holding at least one target under `label`.
    pub fn origins_with(&self, label: &Label) -> impl Iterator<Item = EntityId> + '_ {
        self.origins_by_label
            .get(label)
            .into_iter()
            .flat_map(|m| m.keys().copied())
    }

    /// Iterates every entity targeted under `label`.
    pub fn targets_with(&self, label: &Label) -> impl Iterator<Item = EntityId> + '_ {
        self.targets_by_label
            .get(label)
            .into_iter()
            .flat_map(|m| m.keys().copied())
    }

    /// Number of distinct origins under `label`.
    #[must_use]
    pub fn origin_count(&self, label: &Label) -> usize {
        self.origins_by_label.get(label).map_or(0, HashMap::len)
    }

    /// Number of distinct targets under `label`.
    #[must_use]
    pub fn targeted_count(&self, label: &Label) -> usize {
        self.targets_by_label.get(label).map_or(0, HashMap::len)
    }

    /// Labels under which `origin` has outgoing edges, oldest first.
    #[must_use]
    pub fn labels_from(&self, origin: EntityId) -> Vec<Label> {
        let Some(by_label) = self.forward.get(&origin) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = by_label
            .iter()
            .filter_map(|(label, targets)| {
                targets.values().map(|e| e.seq).min().map(|seq| (seq, label))
            })
            .collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, l)| l.clone()).collect()
    }

    /// Labels under which `target` has incoming edges, oldest first.
    #[must_use]
    pub fn labels_to(&self, target: EntityId) -> Vec<Label> {
        let Some(by_label) = self.reverse.get(&target) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = by_label
            .iter()
            .filter_map(|(label, origins)| {
                origins
                    .iter()
                    .filter_map(|o| self.edge(*o, label, target).map(|e| e.seq))
                    .min()
                    .map(|seq| (seq, label))
            })
            .collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, l)| l.clone()).collect()
    }

    /// Outgoing `(label, target)` pairs of `origin`, in insertion order.
    #[must_use]
    pub fn outgoing(&self, origin: EntityId) -> Vec<(Label, EntityId)> {
        let Some(by_label) = self.forward.get(&origin) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = by_label
            .iter()
            .flat_map(|(label, targets)| {
                targets.iter().map(move |(t, edge)| (edge.seq, label, *t))
            })
            .collect();
        ordered.sort_unstable_by_key(|(seq, _, _)| *seq);
        ordered
            .into_iter()
            .map(|(_, label, t)| (label.clone(), t))
            .collect()
    }

    /// Incoming `(origin, label)` pairs of `target`, in insertion order.
    #[must_use]
    pub fn incoming(&self, target: EntityId) -> Vec<(EntityId, Label)> {
        let Some(by_label) = self.reverse.get(&target) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = by_label
            .iter()
            .flat_map(|(label, origins)| {
                origins.iter().filter_map(move |o| {
                    self.edge(*o, label, target).map(|edge| (edge.seq, *o, label))
                })
            })
            .collect();
        ordered.sort_unstable_by_key(|(seq, _, _)| *seq);
        ordered
            .into_iter()
            .map(|(_, o, label)| (o, label.clone()))
            .collect()
    }

    /// Returns true if `origin` has any outgoing edge.
    #[must_use]
    pub fn has_outgoing(&self, origin: EntityId) -> bool {
        self.forward.contains_key(&origin)
    }

    /// Returns true if `target` has any incoming edge.
    #[must_use]
    pub fn has_incoming(&self, target: EntityId) -> bool {
        self.reverse.contains_key(&target)
    }

    /// Every edge as `(origin, label, target, edge)`, in insertion order.
    #[must_use]
    pub fn edges(&self) -> Vec<(EntityId, &Label, EntityId, &Edge)> {
        let mut all: Vec<_> = self
            .forward
            .iter()
            .flat_map(|(origin, by_label)| {
                by_label.iter().flat_map(move |(label, targets)| {
                    targets
                        .iter()
                        .map(move |(target, edge)| (*origin, label, *target, edge))
                })
            })
            .collect();
        all.sort_unstable_by_key(|(_, _, _, edge)| edge.seq);
        all
    }

    /// Checks that the forward index, the reverse index and the counters agree.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first mismatch found.
    pub fn verify(&self) -> Result<()> {
        let mut edge_count = 0usize;
        for (origin, by_label) in &self.forward {
            for (label, targets) in by_label {
                if targets.is_empty() {
                    return Err(Error::invariant_violation(format!(
                        "empty target set left for {origin:?} {label:?}"
                    )));
                }
                if self.target_count(*origin, label) != targets.len() {
                    return Err(Error::invariant_violation(format!(
                        "origin counter for {origin:?} {label:?} is out of date"
                    )));
                }
                for target in targets.keys() {
                    edge_count += 1;
                    if !self.origins(label, *target).any(|o| o == *origin) {
                        return Err(Error::invariant_violation(format!(
                            "edge {origin:?} -{label:?}-> {target:?} missing from reverse index"
                        )));
                    }
                }
            }
        }

        let mut reverse_count = 0usize;
        for (target, by_label) in &self.reverse {
            for (label, origins) in by_label {
                let counted = self
                    .targets_by_label
                    .get(label)
                    .and_then(|m| m.get(target))
                    .copied()
                    .unwrap_or(0);
                if counted != origins.len() {
                    return Err(Error::invariant_violation(format!(
                        "target counter for {target:?} {label:?} is out of date"
                    )));
                }
                for origin in origins {
                    reverse_count += 1;
                    if !self.has_edge(*origin, label, *target) {
                        return Err(Error::invariant_violation(format!(
                            "reverse edge {origin:?} -{label:?}-> {target:?} has no forward entry"
                        )));
                    }
                }
            }
        }

        if edge_count != reverse_count {
            return Err(Error::invariant_violation(format!(
                "{edge_count} forward edges but {reverse_count} reverse edges"
            )));
        }
        Ok(())
    }
}
