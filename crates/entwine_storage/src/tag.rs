//! Tag index: payload-free membership, indexed both ways.

use std::collections::{HashMap, HashSet};

use entwine_foundation::{EntityId, Error, Result, Value};

/// Stores tag membership for all entities.
#[derive(Clone, Debug, Default)]
pub struct TagIndex {
    /// Tag -> entities holding it.
    by_tag: HashMap<Value, HashSet<EntityId>>,
    /// Entity -> tags it holds, in insertion order.
    by_entity: HashMap<EntityId, Vec<Value>>,
}

impl TagIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag. Returns false if it was already held.
    pub fn insert(&mut self, entity: EntityId, tag: Value) -> bool {
        if !self.by_tag.entry(tag.clone()).or_default().insert(entity) {
            return false;
        }
        self.by_entity.entry(entity).or_default().push(tag);
        true
    }

    /// Removes a tag. Returns false if it was not held.
    pub fn remove(&mut self, entity: EntityId, tag: &Value) -> bool {
        let Some(holders) = self.by_tag.get_mut(tag) else {
            return false;
        };
        if !holders.remove(&entity) {
            return false;
        }
        if holders.is_empty() {
            self.by_tag.remove(tag);
        }

        if let Some(tags) = self.by_entity.get_mut(&entity) {
            tags.retain(|t| t != tag);
            if tags.is_empty() {
                self.by_entity.remove(&entity);
            }
        }
        true
    }

    /// Removes every tag held by an entity, in insertion order.
    pub fn take_all(&mut self, entity: EntityId) -> Vec<Value> {
        let tags = self.by_entity.remove(&entity).unwrap_or_default();
        for tag in &tags {
            if let Some(holders) = self.by_tag.get_mut(tag) {
                holders.remove(&entity);
                if holders.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
        tags
    }

    /// Checks local membership.
    #[must_use]
    pub fn contains(&self, entity: EntityId, tag: &Value) -> bool {
        self.by_tag
            .get(tag)
            .is_some_and(|holders| holders.contains(&entity))
    }

    /// Tags held locally by an entity, in insertion order.
    #[must_use]
    pub fn tags_of(&self, entity: EntityId) -> &[Value] {
        self.by_entity.get(&entity).map_or(&[][..], Vec::as_slice)
    }

    /// Returns true if the entity holds at least one tag.
    #[must_use]
    pub fn has_any(&self, entity: EntityId) -> bool {
        self.by_entity.contains_key(&entity)
    }

    /// Iterates entities holding a tag.
    pub fn entities_with(&self, tag: &Value) -> impl Iterator<Item = EntityId> + '_ {
        self.by_tag
            .get(tag)
            .into_iter()
            .flat_map(|holders| holders.iter().copied())
    }

    /// Number of entities holding a tag.
    #[must_use]
    pub fn holder_count(&self, tag: &Value) -> usize {
        self.by_tag.get(tag).map_or(0, HashSet::len)
    }

    /// Iterates every `(entity, tag)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Value)> {
        self.by_entity
            .iter()
            .flat_map(|(entity, tags)| tags.iter().map(move |tag| (*entity, tag)))
    }

    /// Checks that both directions agree.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first mismatch found.
    pub fn verify(&self) -> Result<()> {
        for (tag, holders) in &self.by_tag {
            for entity in holders {
                if !self.tags_of(*entity).contains(tag) {
                    return Err(Error::invariant_violation(format!(
                        "tag {tag:?} on {entity:?} missing from entity index"
                    )));
                }
            }
        }
        for (entity, tags) in &self.by_entity {
            for tag in tags {
                if !self.contains(*entity, tag) {
                    return Err(Error::invariant_violation(format!(
                        "entity index lists tag {tag:?} on {entity:?} without membership"
                    )));
                }
            }
        }
        Ok(())
    }
}
