//! Component change notification.
//!
//! Hooks run synchronously after the component index already reflects a
//! mutation, so a callback reading the registry observes the new state.

use std::fmt;

use entwine_foundation::{ComponentKey, EntityId, Error, Result, Value};

use crate::registry::Registry;

/// One component add, replace or removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentChange {
    /// Entity whose component changed.
    pub entity: EntityId,
    /// Key that changed.
    pub key: ComponentKey,
    /// Value before the change, absent for an add.
    pub old: Option<Value>,
    /// Value after the change, absent for a removal.
    pub new: Option<Value>,
}

impl ComponentChange {
    /// Returns true if the component did not exist before.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    /// Returns true if the component no longer exists.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.new.is_none()
    }
}

/// Handle for unregistering a hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

/// Callback signature for component hooks.
pub type HookFn = dyn Fn(&Registry, &ComponentChange) -> Result<()> + Send + Sync;

struct HookEntry {
    id: HookId,
    scope: Option<ComponentKey>,
    callback: Box<HookFn>,
}

/// Registered component hooks, in registration order.
#[derive(Default)]
pub struct HookRegistry {
    entries: Vec<HookEntry>,
    next_id: u64,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook; `scope` of `None` observes every key.
    pub fn register(&mut self, scope: Option<ComponentKey>, callback: Box<HookFn>) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.entries.push(HookEntry {
            id,
            scope,
            callback,
        });
        id
    }

    /// Removes a hook. Returns false if the id is unknown.
    pub fn unregister(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every hook observing `change.key`.
    ///
    /// All matching hooks run even if one fails.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, wrapped as `HookFailed`.
    pub fn dispatch(&self, registry: &Registry, change: &ComponentChange) -> Result<()> {
        let mut first_error = None;
        for entry in &self.entries {
            if entry.scope.as_ref().is_some_and(|key| *key != change.key) {
                continue;
            }
            tracing::trace!(hook = ?entry.id, entity = ?change.entity, key = ?change.key, "dispatching hook");
            if let Err(err) = (entry.callback)(registry, change) {
                tracing::debug!(hook = ?entry.id, error = %err, "hook failed");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(Error::hook_failed(err)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
