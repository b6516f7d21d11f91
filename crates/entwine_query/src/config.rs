//! Configuration for a [`QueryEngine`](crate::QueryEngine).

/// Default bound on the number of cached query nodes.
pub const DEFAULT_MAX_CACHED_QUERIES: usize = 4096;

/// Configuration for the query engine's result cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryConfig {
    /// Whether evaluated results are memoized across calls.
    pub cache_enabled: bool,

    /// Number of cached nodes at which the cache is dropped and rebuilt.
    pub max_cached_queries: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_cached_queries: DEFAULT_MAX_CACHED_QUERIES,
        }
    }
}

impl QueryConfig {
    /// Creates a configuration that evaluates every query from scratch.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            cache_enabled: false,
            ..Self::default()
        }
    }

    /// Builder method to enable/disable caching.
    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Builder method to set the cache bound.
    #[must_use]
    pub fn with_max_cached_queries(mut self, max: usize) -> Self {
        self.max_cached_queries = max;
        self
    }
}
