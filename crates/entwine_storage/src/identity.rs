//! Identity table: canonical uid to entity mapping with generational slots.
//!
//! Every [`Uid`] resolves to exactly one live [`EntityId`]. Slots are reused
//! from a free list after destruction; the generation counter makes handles
//! to a destroyed entity detectable as stale.

// Allow u64 to usize casts - we target 64-bit systems
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use entwine_foundation::{EntityId, Error, Result, Uid};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Slot {
    /// Even generations are free, odd generations are alive.
    generation: u32,
    uid: Option<Uid>,
}

/// Maps caller identities to entity handles.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityTable {
    slots: Vec<Slot>,
    free_list: Vec<u64>,
    by_uid: HashMap<Uid, EntityId>,
    next_unique: u64,
    live_count: usize,
}

impl EntityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `uid`, allocating a slot on first reference.
    pub fn resolve(&mut self, uid: Uid) -> EntityId {
        if let Some(&id) = self.by_uid.get(&uid) {
            return id;
        }
        let id = self.allocate(uid.clone());
        self.by_uid.insert(uid, id);
        id
    }

    /// Returns the handle for `uid` without allocating.
    #[must_use]
    pub fn lookup(&self, uid: &Uid) -> Option<EntityId> {
        self.by_uid.get(uid).copied()
    }

    /// Allocates an entity under a uid never issued before by this table.
    pub fn new_unique(&mut self) -> EntityId {
        loop {
            let uid = Uid::Unique(self.next_unique);
            self.next_unique += 1;
            if !self.by_uid.contains_key(&uid) {
                return self.resolve(uid);
            }
        }
    }

    /// Returns the handle of the global entity.
    pub fn global(&mut self) -> EntityId {
        self.resolve(Uid::Global)
    }

    fn allocate(&mut self, uid: Uid) -> EntityId {
        self.live_count += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.uid = Some(uid);
            EntityId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u64;
            self.slots.push(Slot {
                generation: 1,
                uid: Some(uid),
            });
            EntityId::new(index, 1)
        }
    }

    /// Frees the slot of a live entity and forgets its uid.
    ///
    /// A later [`resolve`](Self::resolve) of the same uid yields a new handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is stale or was never allocated.
    pub fn destroy(&mut self, id: EntityId) -> Result<Uid> {
        self.validate(id)?;

        let slot = &mut self.slots[id.index as usize];
        slot.generation += 1;
        let uid = slot.uid.take();
        self.free_list.push(id.index);
        self.live_count -= 1;

        match uid {
            Some(uid) => {
                self.by_uid.remove(&uid);
                Ok(uid)
            }
            None => Err(Error::invariant_violation(format!(
                "live slot {id:?} has no uid"
            ))),
        }
    }

    /// Checks if an entity exists and is not stale.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && id.generation % 2 == 1)
    }

    /// Validates that an entity is live.
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` on a generation mismatch and `EntityNotFound`
    /// for indices never allocated or currently free.
    pub fn validate(&self, id: EntityId) -> Result<()> {
        let Some(slot) = self.slots.get(id.index as usize) else {
            return Err(Error::entity_not_found(id));
        };

        if slot.generation != id.generation {
            return Err(Error::stale_entity(id));
        }

        if slot.generation % 2 == 0 {
            return Err(Error::entity_not_found(id));
        }

        Ok(())
    }

    /// Returns the uid of a live entity.
    #[must_use]
    pub fn uid(&self, id: EntityId) -> Option<&Uid> {
        if !self.exists(id) {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .and_then(|slot| slot.uid.as_ref())
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterates over all live entity IDs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.generation % 2 == 1)
            .map(|(idx, slot)| EntityId::new(idx as u64, slot.generation))
    }

    /// Returns the current generation for an index, if it exists.
    #[must_use]
    pub fn generation(&self, index: u64) -> Option<u32> {
        self.slots.get(index as usize).map(|slot| slot.generation)
    }
}
