//! Component index: one value per (entity, key), indexed both ways.
//!
//! `data` answers "which entities hold this key" for queries, `by_entity`
//! answers "which keys does this entity hold" for clearing and enumeration.
//! Inheritance is layered on top by the registry, never stored here.

use std::collections::HashMap;

use entwine_foundation::{ComponentKey, EntityId, Error, Result, Value};

/// Stores component values for all entities.
#[derive(Clone, Debug, Default)]
pub struct ComponentIndex {
    /// Component data: key -> entity -> value.
    data: HashMap<ComponentKey, HashMap<EntityId, Value>>,
    /// Keys held by each entity, in insertion order.
    by_entity: HashMap<EntityId, Vec<ComponentKey>>,
}

impl ComponentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the key's kind does not accept the value.
    pub fn insert(
        &mut self,
        entity: EntityId,
        key: ComponentKey,
        value: Value,
    ) -> Result<Option<Value>> {
        let actual = value.value_type();
        if !key.kind.accepts(&actual) {
            return Err(Error::type_mismatch(key.kind.clone(), actual));
        }

        let previous = self
            .data
            .entry(key.clone())
            .or_default()
            .insert(entity, value);

        if previous.is_none() {
            self.by_entity.entry(entity).or_default().push(key);
        }

        Ok(previous)
    }

    /// Gets a locally held value.
    #[must_use]
    pub fn get(&self, entity: EntityId, key: &ComponentKey) -> Option<&Value> {
        self.data.get(key)?.get(&entity)
    }

    /// Checks if an entity holds a key locally.
    #[must_use]
    pub fn contains(&self, entity: EntityId, key: &ComponentKey) -> bool {
        self.data
            .get(key)
            .is_some_and(|holders| holders.contains_key(&entity))
    }

    /// Removes a value, returning it if it existed.
    pub fn remove(&mut self, entity: EntityId, key: &ComponentKey) -> Option<Value> {
        let holders = self.data.get_mut(key)?;
        let value = holders.remove(&entity)?;
        if holders.is_empty() {
            self.data.remove(key);
        }

        if let Some(keys) = self.by_entity.get_mut(&entity) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_entity.remove(&entity);
            }
        }

        Some(value)
    }

    /// Removes every value held by an entity, in insertion order.
    pub fn take_all(&mut self, entity: EntityId) -> Vec<(ComponentKey, Value)> {
        let Some(keys) = self.by_entity.remove(&entity) else {
            return Vec::new();
        };

        keys.into_iter()
            .filter_map(|key| {
                let holders = self.data.get_mut(&key)?;
                let value = holders.remove(&entity)?;
                if holders.is_empty() {
                    self.data.remove(&key);
                }
                Some((key, value))
            })
            .collect()
    }

    /// Keys held locally by an entity, in insertion order.
    #[must_use]
    pub fn keys_of(&self, entity: EntityId) -> &[ComponentKey] {
        self.by_entity.get(&entity).map_or(&[][..], Vec::as_slice)
    }

    /// Returns true if the entity holds at least one component.
    #[must_use]
    pub fn has_any(&self, entity: EntityId) -> bool {
        self.by_entity.contains_key(&entity)
    }

    /// Iterates entities holding a key.
    pub fn entities_with(&self, key: &ComponentKey) -> impl Iterator<Item = EntityId> + '_ {
        self.data
            .get(key)
            .into_iter()
            .flat_map(|holders| holders.keys().copied())
    }

    /// Number of entities holding a key.
    #[must_use]
    pub fn holder_count(&self, key: &ComponentKey) -> usize {
        self.data.get(key).map_or(0, HashMap::len)
    }

    /// Iterates every stored `(entity, key, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &ComponentKey, &Value)> {
        self.by_entity.iter().flat_map(move |(entity, keys)| {
            keys.iter()
                .filter_map(move |key| self.get(*entity, key).map(|value| (*entity, key, value)))
        })
    }

    /// Checks that both directions agree.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first mismatch found.
    pub fn verify(&self) -> Result<()> {
        for (key, holders) in &self.data {
            for entity in holders.keys() {
                if !self.keys_of(*entity).contains(key) {
                    return Err(Error::invariant_violation(format!(
                        "component {key:?} on {entity:?} missing from entity index"
                    )));
                }
            }
        }
        for (entity, keys) in &self.by_entity {
            for key in keys {
                if !self.contains(*entity, key) {
                    return Err(Error::invariant_violation(format!(
                        "entity index lists {key:?} on {entity:?} without a value"
                    )));
                }
            }
        }
        Ok(())
    }
}
