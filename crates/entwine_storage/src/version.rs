//! Per-index mutation counters.

use std::collections::HashMap;

use entwine_foundation::IndexKey;

/// Monotonic version counters keyed by index.
///
/// A counter springs into existence at zero on first read and only ever
/// grows; query caches compare snapshots of these counters to decide whether
/// a cached result is still valid.
#[derive(Debug, Clone, Default)]
pub struct VersionTable {
    counters: HashMap<IndexKey, u64>,
}

impl VersionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of `key`.
    #[must_use]
    pub fn get(&self, key: &IndexKey) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Increments `key` and returns the new version.
    pub fn bump(&mut self, key: IndexKey) -> u64 {
        let counter = self.counters.entry(key).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Raises `key` to at least `version`.
    pub fn restore(&mut self, key: IndexKey, version: u64) {
        let counter = self.counters.entry(key).or_insert(0);
        *counter = (*counter).max(version);
    }

    /// Iterates over all counters touched so far.
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, u64)> {
        self.counters.iter().map(|(k, v)| (k, *v))
    }
}
