//! The registry: identity table plus every attribute index.
//!
//! All mutation goes through [`Registry`], which keeps the indices
//! consistent, bumps version counters, and fires component hooks. Reads come
//! in two flavours: `*_local` reads see only the entity itself, the others
//! fall back along the entity's lineage (see [`Resolver`]).

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use entwine_foundation::{ComponentKey, EntityId, Error, IndexKey, Label, Result, Uid, Value};

use crate::component::ComponentIndex;
use crate::config::RegistryConfig;
use crate::hooks::{ComponentChange, HookId, HookRegistry};
use crate::identity::EntityTable;
use crate::inherit::Resolver;
use crate::relation::RelationIndex;
use crate::schema::{OnDestroy, RelationSchema};
use crate::tag::TagIndex;
use crate::version::VersionTable;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registry instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An entity-component-relation store.
pub struct Registry {
    pub(crate) id: RegistryId,
    pub(crate) config: RegistryConfig,
    pub(crate) entities: EntityTable,
    pub(crate) components: ComponentIndex,
    pub(crate) tags: TagIndex,
    pub(crate) relations: RelationIndex,
    pub(crate) versions: VersionTable,
    pub(crate) hooks: HookRegistry,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("entities", &self.entities.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let id = RegistryId::next();
        tracing::debug!(?id, "registry created");
        Self {
            id,
            config,
            entities: EntityTable::new(),
            components: ComponentIndex::new(),
            tags: TagIndex::new(),
            relations: RelationIndex::new(),
            versions: VersionTable::new(),
            hooks: HookRegistry::new(),
        }
    }

    /// Returns this registry's identity.
    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Identity ---

    /// Returns the entity for `uid`, creating it on first reference.
    pub fn entity(&mut self, uid: impl Into<Uid>) -> EntityId {
        self.entities.resolve(uid.into())
    }

    /// Returns the entity for `uid` if it has been referenced before.
    #[must_use]
    pub fn lookup(&self, uid: impl Into<Uid>) -> Option<EntityId> {
        self.entities.lookup(&uid.into())
    }

    /// Creates an entity with a uid distinct from every other.
    pub fn new_entity(&mut self) -> EntityId {
        self.entities.new_unique()
    }

    /// Returns the global entity.
    pub fn global(&mut self) -> EntityId {
        self.entities.global()
    }

    /// Returns the uid of a live entity.
    #[must_use]
    pub fn uid(&self, entity: EntityId) -> Option<&Uid> {
        self.entities.uid(entity)
    }

    /// Checks if an entity handle is live.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.exists(entity)
    }

    /// Validates an entity handle.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `EntityNotFound`.
    pub fn validate(&self, entity: EntityId) -> Result<()> {
        self.entities.validate(entity)
    }

    /// Live entities holding at least one component, tag or relation.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.iter_entities().collect()
    }

    /// Lazy form of [`entities`](Self::entities).
    pub fn iter_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().filter(|e| self.is_populated(*e))
    }

    /// Returns true if `entity` holds or is the target of any data.
    #[must_use]
    pub fn is_populated(&self, entity: EntityId) -> bool {
        self.components.has_any(entity)
            || self.tags.has_any(entity)
            || self.relations.has_outgoing(entity)
            || self.relations.has_incoming(entity)
    }

    /// Creates a new entity inheriting from `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not live.
    pub fn instantiate(&mut self, base: EntityId) -> Result<EntityId> {
        self.validate(base)?;
        let entity = self.new_entity();
        self.relate(entity, Label::IsA, base)?;
        Ok(entity)
    }

    /// Removes every local component, tag and outgoing relation of `entity`.
    ///
    /// Inherited data and data of entities inheriting from `entity` are left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live, or the first hook error
    /// once the entity is fully cleared.
    pub fn clear(&mut self, entity: EntityId) -> Result<()> {
        self.validate(entity)?;
        let components = self.clear_components(entity);
        self.clear_tags(entity)?;
        self.clear_relations(entity)?;
        components
    }

    /// Destroys an entity.
    ///
    /// Local data is cleared, every inbound edge is removed, and the handle
    /// becomes stale. Origins of inbound edges whose label has an
    /// [`OnDestroy::Cascade`] schema are destroyed too.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not live, or the first hook error
    /// once every affected entity is destroyed.
    pub fn destroy(&mut self, entity: EntityId) -> Result<()> {
        self.validate(entity)?;

        let mut first_error = None;
        let mut worklist = vec![entity];
        while let Some(victim) = worklist.pop() {
            if !self.is_alive(victim) {
                continue;
            }

            for (origin, label) in self.relations.incoming(victim) {
                self.relations.remove(origin, &label, victim);
                let cascade = self
                    .relations
                    .schema(&label)
                    .is_some_and(|s| s.on_destroy == OnDestroy::Cascade);
                if cascade && origin != victim {
                    tracing::trace!(?victim, ?origin, ?label, "cascading destroy");
                    worklist.push(origin);
                }
                self.touch(IndexKey::Relation(label));
            }

            if let Err(err) = self.clear(victim) {
                first_error.get_or_insert(err);
            }
            self.entities.destroy(victim)?;
            tracing::debug!(entity = ?victim, "entity destroyed");
        }

        self.after_mutation()?;
        first_error.map_or(Ok(()), Err)
    }

    // --- Components ---

    /// Sets a component, returning the previous local value.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the key's kind does not accept the value,
    /// an entity error if the entity is not live, or a hook error.
    pub fn set_component(
        &mut self,
        entity: EntityId,
        key: ComponentKey,
        value: Value,
    ) -> Result<Option<Value>> {
        self.validate(entity)?;
        let old = self.components.insert(entity, key.clone(), value.clone())?;
        tracing::trace!(?entity, ?key, "component set");
        self.touch(IndexKey::Component(key.clone()));
        self.after_mutation()?;

        self.notify(ComponentChange {
            entity,
            key,
            old: old.clone(),
            new: Some(value),
        })?;
        Ok(old)
    }

    /// Sets an unnamed component keyed by the value's own type.
    ///
    /// # Errors
    ///
    /// See [`set_component`](Self::set_component).
    pub fn set_value(&mut self, entity: EntityId, value: Value) -> Result<Option<Value>> {
        self.set_component(entity, ComponentKey::for_value(&value), value)
    }

    /// Gets a component, falling back along the lineage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if neither the entity nor any ancestor holds the
    /// key, or `CycleDetected` if the lineage is cyclic and nothing matched.
    pub fn component(&self, entity: EntityId, key: &ComponentKey) -> Result<&Value> {
        self.component_via(entity, key, &self.config.traverse)
    }

    /// Gets a component, following `traverse` instead of the configured labels.
    ///
    /// # Errors
    ///
    /// See [`component`](Self::component).
    pub fn component_via(
        &self,
        entity: EntityId,
        key: &ComponentKey,
        traverse: &[Label],
    ) -> Result<&Value> {
        self.validate(entity)?;
        self.resolver_via(traverse)
            .find_map(entity, |e| self.components.get(e, key))?
            .ok_or_else(|| Error::not_found(entity, format!("component {key}")))
    }

    /// Gets a component along the lineage, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an entity error, or `CycleDetected` if nothing matched in a
    /// cyclic lineage.
    pub fn find_component(&self, entity: EntityId, key: &ComponentKey) -> Result<Option<&Value>> {
        self.validate(entity)?;
        self.resolver()
            .find_map(entity, |e| self.components.get(e, key))
    }

    /// Checks for a component along the lineage.
    ///
    /// # Errors
    ///
    /// See [`find_component`](Self::find_component).
    pub fn has_component(&self, entity: EntityId, key: &ComponentKey) -> Result<bool> {
        Ok(self.find_component(entity, key)?.is_some())
    }

    /// Gets a locally held component.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entity does not hold the key itself.
    pub fn component_local(&self, entity: EntityId, key: &ComponentKey) -> Result<&Value> {
        self.validate(entity)?;
        self.components
            .get(entity, key)
            .ok_or_else(|| Error::not_found(entity, format!("component {key}")))
    }

    /// Checks for a locally held component.
    #[must_use]
    pub fn has_component_local(&self, entity: EntityId, key: &ComponentKey) -> bool {
        self.components.contains(entity, key)
    }

    /// Removes a local component and returns it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entity does not hold the key itself, or a
    /// hook error.
    pub fn remove_component(&mut self, entity: EntityId, key: &ComponentKey) -> Result<Value> {
        self.pop_component(entity, key)?
            .ok_or_else(|| Error::not_found(entity, format!("component {key}")))
    }

    /// Removes a local component if present.
    ///
    /// # Errors
    ///
    /// Returns an entity error or a hook error.
    pub fn pop_component(&mut self, entity: EntityId, key: &ComponentKey) -> Result<Option<Value>> {
        self.validate(entity)?;
        let Some(old) = self.components.remove(entity, key) else {
            return Ok(None);
        };
        tracing::trace!(?entity, ?key, "component removed");
        self.touch(IndexKey::Component(key.clone()));
        self.after_mutation()?;

        self.notify(ComponentChange {
            entity,
            key: key.clone(),
            old: Some(old.clone()),
            new: None,
        })?;
        Ok(Some(old))
    }

    /// Returns the (possibly inherited) component, setting `default` locally
    /// when none is found.
    ///
    /// # Errors
    ///
    /// See [`set_component`](Self::set_component).
    pub fn component_or_insert(
        &mut self,
        entity: EntityId,
        key: ComponentKey,
        default: Value,
    ) -> Result<Value> {
        if let Some(found) = self.find_component(entity, &key)? {
            return Ok(found.clone());
        }
        self.set_component(entity, key, default.clone())?;
        Ok(default)
    }

    /// Keys held by the entity or any ancestor, closest first.
    ///
    /// # Errors
    ///
    /// Returns an entity error or `CycleDetected`.
    pub fn component_keys(&self, entity: EntityId) -> Result<Vec<ComponentKey>> {
        self.validate(entity)?;
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for e in self.resolver().lineage(entity)? {
            for key in self.components.keys_of(e) {
                if seen.insert(key) {
                    keys.push(key.clone());
                }
            }
        }
        Ok(keys)
    }

    /// Keys held locally, in insertion order.
    #[must_use]
    pub fn component_keys_local(&self, entity: EntityId) -> &[ComponentKey] {
        self.components.keys_of(entity)
    }

    /// Sets several components.
    ///
    /// # Errors
    ///
    /// Stops at the first failing write.
    pub fn update_components(
        &mut self,
        entity: EntityId,
        pairs: impl IntoIterator<Item = (ComponentKey, Value)>,
    ) -> Result<()> {
        for (key, value) in pairs {
            self.set_component(entity, key, value)?;
        }
        Ok(())
    }

    /// Sets several unnamed components keyed by their values' types.
    ///
    /// # Errors
    ///
    /// Stops at the first failing write.
    pub fn update_component_values(
        &mut self,
        entity: EntityId,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<()> {
        for value in values {
            self.set_value(entity, value)?;
        }
        Ok(())
    }

    /// Removes every local component.
    ///
    /// # Errors
    ///
    /// Returns an entity error, or the first hook error after every
    /// component is removed.
    pub fn clear_components(&mut self, entity: EntityId) -> Result<()> {
        self.validate(entity)?;
        let removed = self.components.take_all(entity);
        if removed.is_empty() {
            return Ok(());
        }
        for (key, _) in &removed {
            self.touch(IndexKey::Component(key.clone()));
        }
        self.after_mutation()?;

        let mut first_error = None;
        for (key, old) in removed {
            let change = ComponentChange {
                entity,
                key,
                old: Some(old),
                new: None,
            };
            if let Err(err) = self.notify(change) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // --- Tags ---

    /// Adds a tag. Returns false if it was already held locally.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn add_tag(&mut self, entity: EntityId, tag: impl Into<Value>) -> Result<bool> {
        self.validate(entity)?;
        let tag = tag.into();
        if !self.tags.insert(entity, tag.clone()) {
            return Ok(false);
        }
        tracing::trace!(?entity, ?tag, "tag added");
        self.touch(IndexKey::Tag(tag));
        self.after_mutation()?;
        Ok(true)
    }

    /// Removes a tag if held locally. Returns false if it was not.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn discard_tag(&mut self, entity: EntityId, tag: &Value) -> Result<bool> {
        self.validate(entity)?;
        if !self.tags.remove(entity, tag) {
            return Ok(false);
        }
        tracing::trace!(?entity, ?tag, "tag discarded");
        self.touch(IndexKey::Tag(tag.clone()));
        self.after_mutation()?;
        Ok(true)
    }

    /// Removes a locally held tag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entity does not hold the tag itself.
    pub fn remove_tag(&mut self, entity: EntityId, tag: &Value) -> Result<()> {
        if self.discard_tag(entity, tag)? {
            Ok(())
        } else {
            Err(Error::not_found(entity, format!("tag {tag:?}")))
        }
    }

    /// Checks for a tag along the lineage.
    ///
    /// # Errors
    ///
    /// Returns an entity error, or `CycleDetected` if the tag is not found
    /// in a cyclic lineage.
    pub fn has_tag(&self, entity: EntityId, tag: &Value) -> Result<bool> {
        self.validate(entity)?;
        self.resolver().any(entity, |e| self.tags.contains(e, tag))
    }

    /// Checks for a locally held tag.
    #[must_use]
    pub fn has_tag_local(&self, entity: EntityId, tag: &Value) -> bool {
        self.tags.contains(entity, tag)
    }

    /// Tags held by the entity or any ancestor, closest first.
    ///
    /// # Errors
    ///
    /// Returns an entity error or `CycleDetected`.
    pub fn tags(&self, entity: EntityId) -> Result<Vec<Value>> {
        self.validate(entity)?;
        let mut seen = HashSet::new();
        let mut tags = Vec::new();
        for e in self.resolver().lineage(entity)? {
            for tag in self.tags.tags_of(e) {
                if seen.insert(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        Ok(tags)
    }

    /// Tags held locally, in insertion order.
    #[must_use]
    pub fn tags_local(&self, entity: EntityId) -> &[Value] {
        self.tags.tags_of(entity)
    }

    /// Adds several tags, returning how many were new.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn add_tags(
        &mut self,
        entity: EntityId,
        tags: impl IntoIterator<Item = Value>,
    ) -> Result<usize> {
        let mut added = 0;
        for tag in tags {
            if self.add_tag(entity, tag)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Discards several tags, returning how many were held.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn discard_tags<'t>(
        &mut self,
        entity: EntityId,
        tags: impl IntoIterator<Item = &'t Value>,
    ) -> Result<usize> {
        let mut discarded = 0;
        for tag in tags {
            if self.discard_tag(entity, tag)? {
                discarded += 1;
            }
        }
        Ok(discarded)
    }

    /// Removes every local tag.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn clear_tags(&mut self, entity: EntityId) -> Result<()> {
        self.validate(entity)?;
        let removed = self.tags.take_all(entity);
        if removed.is_empty() {
            return Ok(());
        }
        for tag in removed {
            self.touch(IndexKey::Tag(tag));
        }
        self.after_mutation()
    }

    // --- Relations ---

    /// Adds an edge `origin -label-> target`. Returns false if it existed.
    ///
    /// Under an exclusive schema, any other target of `(origin, label)` is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns an entity error for either endpoint.
    pub fn relate(
        &mut self,
        origin: EntityId,
        label: impl Into<Label>,
        target: EntityId,
    ) -> Result<bool> {
        let label = label.into();
        self.validate(origin)?;
        self.validate(target)?;
        if self.relations.has_edge(origin, &label, target) {
            return Ok(false);
        }
        if self.relations.schema(&label).is_some_and(RelationSchema::is_exclusive) {
            self.displace_targets(origin, &label, target);
        }
        self.relations.insert(origin, label.clone(), target, None);
        tracing::trace!(?origin, ?label, ?target, "relation added");
        self.touch(IndexKey::Relation(label));
        self.after_mutation()?;
        Ok(true)
    }

    /// Makes `target` the only target of `(origin, label)`.
    ///
    /// # Errors
    ///
    /// Returns an entity error for either endpoint.
    pub fn set_relation(
        &mut self,
        origin: EntityId,
        label: impl Into<Label>,
        target: EntityId,
    ) -> Result<()> {
        let label = label.into();
        self.validate(origin)?;
        self.validate(target)?;
        let mut changed = self.displace_targets(origin, &label, target);
        if !self.relations.has_edge(origin, &label, target) {
            self.relations.insert(origin, label.clone(), target, None);
            changed = true;
        }
        if changed {
            tracing::trace!(?origin, ?label, ?target, "relation set");
            self.touch(IndexKey::Relation(label));
            self.after_mutation()?;
        }
        Ok(())
    }

    /// Removes an edge if present. Returns false if it was absent.
    ///
    /// # Errors
    ///
    /// Returns an entity error for the origin.
    pub fn unrelate(&mut self, origin: EntityId, label: &Label, target: EntityId) -> Result<bool> {
        self.validate(origin)?;
        if self.relations.remove(origin, label, target).is_none() {
            return Ok(false);
        }
        tracing::trace!(?origin, ?label, ?target, "relation removed");
        self.touch(IndexKey::Relation(label.clone()));
        self.after_mutation()?;
        Ok(true)
    }

    /// Removes an edge held locally.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the edge does not exist.
    pub fn remove_relation(&mut self, origin: EntityId, label: &Label, target: EntityId) -> Result<()> {
        if self.unrelate(origin, label, target)? {
            Ok(())
        } else {
            Err(Error::not_found(
                origin,
                format!("relation {label:?} to {target:?}"),
            ))
        }
    }

    /// The single target of `(origin, label)`, falling back along the lineage.
    ///
    /// The closest entity holding any target under `label` answers.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entity in the lineage has a target,
    /// `NotExclusive` if the answering entity has several, or
    /// `CycleDetected`.
    pub fn relation_target(&self, origin: EntityId, label: &Label) -> Result<EntityId> {
        self.validate(origin)?;
        let holder = self.resolver().find_map(origin, |e| {
            (self.relations.target_count(e, label) > 0).then_some(e)
        })?;
        let Some(holder) = holder else {
            return Err(Error::not_found(origin, format!("relation {label:?}")));
        };

        let targets = self.relations.targets(holder, label);
        match targets.as_slice() {
            [target] => Ok(*target),
            _ => Err(Error::not_exclusive(origin, label.to_string(), targets.len())),
        }
    }

    /// Targets of `(origin, label)` across the lineage, closest first.
    ///
    /// # Errors
    ///
    /// Returns an entity error or `CycleDetected`.
    pub fn relation_targets(&self, origin: EntityId, label: &Label) -> Result<Vec<EntityId>> {
        self.validate(origin)?;
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for e in self.resolver().lineage(origin)? {
            for target in self.relations.targets(e, label) {
                if seen.insert(target) {
                    targets.push(target);
                }
            }
        }
        Ok(targets)
    }

    /// Targets of `(origin, label)` held locally, in insertion order.
    #[must_use]
    pub fn relation_targets_local(&self, origin: EntityId, label: &Label) -> Vec<EntityId> {
        self.relations.targets(origin, label)
    }

    /// Checks for an edge along the lineage of `origin`.
    ///
    /// # Errors
    ///
    /// Returns an entity error, or `CycleDetected` if the edge is not found
    /// in a cyclic lineage.
    pub fn has_relation(&self, origin: EntityId, label: &Label, target: EntityId) -> Result<bool> {
        self.validate(origin)?;
        self.resolver()
            .any(origin, |e| self.relations.has_edge(e, label, target))
    }

    /// Origins with a local edge `-label-> target`, sorted.
    #[must_use]
    pub fn relation_origins(&self, label: &Label, target: EntityId) -> Vec<EntityId> {
        let mut origins: Vec<_> = self.relations.origins(label, target).collect();
        origins.sort_unstable();
        origins
    }

    /// Replaces the local targets of `(origin, label)`.
    ///
    /// # Errors
    ///
    /// Returns an entity error for any endpoint, or `NotExclusive` if the
    /// label has an exclusive schema and more than one target is given.
    /// Nothing changes in either case.
    pub fn set_relation_targets(
        &mut self,
        origin: EntityId,
        label: impl Into<Label>,
        targets: impl IntoIterator<Item = EntityId>,
    ) -> Result<()> {
        let label = label.into();
        self.validate(origin)?;
        let mut wanted: Vec<EntityId> = Vec::new();
        for target in targets {
            self.validate(target)?;
            if !wanted.contains(&target) {
                wanted.push(target);
            }
        }
        let exclusive = self
            .relations
            .schema(&label)
            .is_some_and(RelationSchema::is_exclusive);
        if exclusive && wanted.len() > 1 {
            return Err(Error::not_exclusive(origin, label.to_string(), wanted.len()));
        }

        let mut changed = false;
        for current in self.relations.targets(origin, &label) {
            if !wanted.contains(&current) {
                self.relations.remove(origin, &label, current);
                changed = true;
            }
        }
        for target in wanted {
            if !self.relations.has_edge(origin, &label, target) {
                self.relations.insert(origin, label.clone(), target, None);
                changed = true;
            }
        }
        if changed {
            self.touch(IndexKey::Relation(label));
            self.after_mutation()?;
        }
        Ok(())
    }

    /// Removes every local target of `(origin, label)`, returning how many.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn clear_relation(&mut self, origin: EntityId, label: &Label) -> Result<usize> {
        self.validate(origin)?;
        let targets = self.relations.targets(origin, label);
        for target in &targets {
            self.relations.remove(origin, label, *target);
        }
        if !targets.is_empty() {
            self.touch(IndexKey::Relation(label.clone()));
            self.after_mutation()?;
        }
        Ok(targets.len())
    }

    /// Removes every outgoing edge of `origin`.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn clear_relations(&mut self, origin: EntityId) -> Result<()> {
        self.validate(origin)?;
        let outgoing = self.relations.outgoing(origin);
        if outgoing.is_empty() {
            return Ok(());
        }
        for (label, target) in outgoing {
            self.relations.remove(origin, &label, target);
            self.touch(IndexKey::Relation(label));
        }
        self.after_mutation()
    }

    /// Labels of the local outgoing edges of `origin`, oldest first.
    #[must_use]
    pub fn relation_labels(&self, origin: EntityId) -> Vec<Label> {
        self.relations.labels_from(origin)
    }

    /// Labels of the incoming edges of `target`, oldest first.
    #[must_use]
    pub fn inbound_relation_labels(&self, target: EntityId) -> Vec<Label> {
        self.relations.labels_to(target)
    }

    fn displace_targets(&mut self, origin: EntityId, label: &Label, keep: EntityId) -> bool {
        let others: Vec<_> = self
            .relations
            .targets(origin, label)
            .into_iter()
            .filter(|t| *t != keep)
            .collect();
        for target in &others {
            self.relations.remove(origin, label, *target);
        }
        !others.is_empty()
    }

    // --- Component relations ---

    /// Sets the payload of the edge `origin -key-> target`, returning the
    /// previous payload.
    ///
    /// Sibling targets keep their payloads unless the label has an exclusive
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` or an entity error.
    pub fn set_relation_component(
        &mut self,
        origin: EntityId,
        key: ComponentKey,
        target: EntityId,
        value: Value,
    ) -> Result<Option<Value>> {
        self.validate(origin)?;
        self.validate(target)?;
        let actual = value.value_type();
        if !key.kind.accepts(&actual) {
            return Err(Error::type_mismatch(key.kind.clone(), actual));
        }

        let label = Label::Component(key);
        if self.relations.schema(&label).is_some_and(RelationSchema::is_exclusive) {
            self.displace_targets(origin, &label, target);
        }
        let previous = self
            .relations
            .insert(origin, label.clone(), target, Some(value))
            .and_then(|edge| edge.payload);
        tracing::trace!(?origin, ?label, ?target, "relation component set");
        self.touch(IndexKey::Relation(label));
        self.after_mutation()?;
        Ok(previous)
    }

    /// Gets the payload of `origin -key-> target`, falling back along the
    /// lineage of `origin`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, an entity error, or `CycleDetected`.
    pub fn relation_component(
        &self,
        origin: EntityId,
        key: &ComponentKey,
        target: EntityId,
    ) -> Result<&Value> {
        self.validate(origin)?;
        let label = Label::Component(key.clone());
        self.resolver()
            .find_map(origin, |e| {
                self.relations
                    .edge(e, &label, target)
                    .and_then(|edge| edge.payload.as_ref())
            })?
            .ok_or_else(|| {
                Error::not_found(origin, format!("relation component {key} to {target:?}"))
            })
    }

    /// Removes the local edge `origin -key-> target`, returning its payload.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the edge or its payload is absent.
    pub fn remove_relation_component(
        &mut self,
        origin: EntityId,
        key: &ComponentKey,
        target: EntityId,
    ) -> Result<Value> {
        self.validate(origin)?;
        let label = Label::Component(key.clone());
        let has_payload = self
            .relations
            .edge(origin, &label, target)
            .is_some_and(|edge| edge.payload.is_some());
        if !has_payload {
            return Err(Error::not_found(
                origin,
                format!("relation component {key} to {target:?}"),
            ));
        }

        let payload = self
            .relations
            .remove(origin, &label, target)
            .and_then(|edge| edge.payload)
            .ok_or_else(|| Error::invariant_violation("relation payload vanished"))?;
        self.touch(IndexKey::Relation(label));
        self.after_mutation()?;
        Ok(payload)
    }

    /// Every `(target, payload)` under `key` across the lineage of `origin`.
    ///
    /// For a target reached from several lineage entries the closest wins.
    ///
    /// # Errors
    ///
    /// Returns an entity error or `CycleDetected`.
    pub fn relation_components(
        &self,
        origin: EntityId,
        key: &ComponentKey,
    ) -> Result<Vec<(EntityId, Value)>> {
        self.validate(origin)?;
        let label = Label::Component(key.clone());
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for e in self.resolver().lineage(origin)? {
            for target in self.relations.targets(e, &label) {
                let payload = self
                    .relations
                    .edge(e, &label, target)
                    .and_then(|edge| edge.payload.as_ref());
                if let Some(payload) = payload {
                    if seen.insert(target) {
                        found.push((target, payload.clone()));
                    }
                }
            }
        }
        Ok(found)
    }

    /// Removes every local edge under `key` from `origin`.
    ///
    /// # Errors
    ///
    /// Returns an entity error.
    pub fn clear_relation_components(&mut self, origin: EntityId, key: &ComponentKey) -> Result<usize> {
        self.clear_relation(origin, &Label::Component(key.clone()))
    }

    // --- Schemas and hooks ---

    /// Registers a relation schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaConflict` if the label already has one.
    pub fn register_relation(&mut self, schema: RelationSchema) -> Result<()> {
        tracing::debug!(label = ?schema.label, "relation schema registered");
        self.relations.register_schema(schema)
    }

    /// Gets the schema registered for a label.
    #[must_use]
    pub fn relation_schema(&self, label: &Label) -> Option<&RelationSchema> {
        self.relations.schema(label)
    }

    /// Registers a hook observing changes to one component key.
    pub fn on_component_change<F>(&mut self, key: ComponentKey, callback: F) -> HookId
    where
        F: Fn(&Registry, &ComponentChange) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.register(Some(key), Box::new(callback))
    }

    /// Registers a hook observing changes to every component key.
    pub fn on_any_component_change<F>(&mut self, callback: F) -> HookId
    where
        F: Fn(&Registry, &ComponentChange) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.register(None, Box::new(callback))
    }

    /// Unregisters a hook. Returns false if the id is unknown.
    pub fn unregister_hook(&mut self, id: HookId) -> bool {
        self.hooks.unregister(id)
    }

    fn notify(&self, change: ComponentChange) -> Result<()> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        self.hooks.dispatch(self, &change)
    }

    // --- Versions, inheritance and verification ---

    /// Current version of one index.
    #[must_use]
    pub fn version(&self, key: &IndexKey) -> u64 {
        self.versions.get(key)
    }

    /// All version counters.
    #[must_use]
    pub fn versions(&self) -> &VersionTable {
        &self.versions
    }

    fn touch(&mut self, key: IndexKey) {
        self.versions.bump(key);
        self.versions.bump(IndexKey::Population);
    }

    /// Resolver following the configured traversal labels.
    #[must_use]
    pub fn resolver(&self) -> Resolver<'_> {
        self.resolver_via(&self.config.traverse)
    }

    /// Resolver following `traverse`, bounded by the configured depth.
    #[must_use]
    pub fn resolver_via<'a>(&'a self, traverse: &'a [Label]) -> Resolver<'a> {
        Resolver::new(&self.relations, traverse).with_max_depth(self.config.max_inheritance_depth)
    }

    /// The lineage of `entity`, closest first.
    ///
    /// # Errors
    ///
    /// Returns an entity error or `CycleDetected`.
    pub fn lineage(&self, entity: EntityId) -> Result<Vec<EntityId>> {
        self.validate(entity)?;
        self.resolver().lineage(entity)
    }

    /// Checks every index for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first problem found.
    pub fn verify(&self) -> Result<()> {
        self.components.verify()?;
        self.tags.verify()?;
        self.relations.verify()?;

        let dead = self
            .components
            .iter()
            .map(|(e, _, _)| e)
            .chain(self.tags.iter().map(|(e, _)| e))
            .chain(
                self.relations
                    .edges()
                    .into_iter()
                    .flat_map(|(o, _, t, _)| [o, t]),
            )
            .find(|e| !self.entities.exists(*e));
        match dead {
            Some(entity) => Err(Error::invariant_violation(format!(
                "index references dead entity {entity:?}"
            ))),
            None => Ok(()),
        }
    }

    fn after_mutation(&self) -> Result<()> {
        if !self.config.verify_indices {
            return Ok(());
        }
        self.verify().inspect_err(|err| {
            tracing::error!(error = %err, "index verification failed");
        })
    }

    /// Read access to the component index.
    #[must_use]
    pub fn component_index(&self) -> &ComponentIndex {
        &self.components
    }

    /// Read access to the tag index.
    #[must_use]
    pub fn tag_index(&self) -> &TagIndex {
        &self.tags
    }

    /// Read access to the relation index.
    #[must_use]
    pub fn relation_index(&self) -> &RelationIndex {
        &self.relations
    }
}
