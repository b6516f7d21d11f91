//! Structural snapshots of a registry.
//!
//! A [`Snapshot`] holds the identity table, every local component, tag and
//! edge, the version counters and the relation schemas. With the `serde`
//! feature it serializes with any serde format; hooks are not captured.

use entwine_foundation::{ComponentKey, EntityId, Error, IndexKey, Label, Result, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::identity::EntityTable;
use crate::registry::Registry;
use crate::schema::RelationSchema;

/// Owned copy of a registry's indexed state.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    /// Identity table, including free slots and generations.
    pub entities: EntityTable,
    /// Local components, in per-entity insertion order.
    pub components: Vec<(EntityId, ComponentKey, Value)>,
    /// Local tags, in per-entity insertion order.
    pub tags: Vec<(EntityId, Value)>,
    /// Edges as `(origin, label, target, payload)`, in insertion order.
    pub relations: Vec<(EntityId, Label, EntityId, Option<Value>)>,
    /// Version counters.
    pub versions: Vec<(IndexKey, u64)>,
    /// Registered relation schemas.
    pub schemas: Vec<RelationSchema>,
}

impl Registry {
    /// Captures the registry's state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.entities.clone(),
            components: self
                .components
                .iter()
                .map(|(e, key, value)| (e, key.clone(), value.clone()))
                .collect(),
            tags: self.tags.iter().map(|(e, tag)| (e, tag.clone())).collect(),
            relations: self
                .relations
                .edges()
                .into_iter()
                .map(|(o, label, t, edge)| (o, label.clone(), t, edge.payload.clone()))
                .collect(),
            versions: self
                .versions
                .iter()
                .map(|(key, v)| (key.clone(), v))
                .collect(),
            schemas: self.relations.schemas().cloned().collect(),
        }
    }

    /// Rebuilds a registry from a snapshot with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`from_snapshot_with_config`](Self::from_snapshot_with_config).
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        Self::from_snapshot_with_config(snapshot, RegistryConfig::default())
    }

    /// Rebuilds a registry from a snapshot.
    ///
    /// The rebuilt registry has a fresh [`RegistryId`](crate::RegistryId).
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the snapshot references an entity
    /// that is not live in its identity table, `TypeMismatch` for a
    /// component that does not fit its key, or `SchemaConflict` for a
    /// duplicated schema.
    pub fn from_snapshot_with_config(snapshot: Snapshot, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        registry.entities = snapshot.entities;

        let check = |registry: &Self, entity: EntityId| {
            if registry.entities.exists(entity) {
                Ok(())
            } else {
                Err(Error::invariant_violation(format!(
                    "snapshot references dead entity {entity:?}"
                )))
            }
        };

        for schema in snapshot.schemas {
            registry.relations.register_schema(schema)?;
        }
        for (entity, key, value) in snapshot.components {
            check(&registry, entity)?;
            registry.components.insert(entity, key, value)?;
        }
        for (entity, tag) in snapshot.tags {
            check(&registry, entity)?;
            registry.tags.insert(entity, tag);
        }
        for (origin, label, target, payload) in snapshot.relations {
            check(&registry, origin)?;
            check(&registry, target)?;
            registry.relations.insert(origin, label, target, payload);
        }
        for (key, version) in snapshot.versions {
            registry.versions.restore(key, version);
        }

        tracing::debug!(
            id = ?registry.id(),
            entities = registry.entities.len(),
            "registry restored from snapshot"
        );
        registry.verify()?;
        Ok(registry)
    }
}
