//! Configuration for a [`Registry`](crate::Registry).

use entwine_foundation::Label;

/// Configuration for a registry.
///
/// Controls default inheritance traversal and debug consistency checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Labels followed by inherited reads, in precedence order.
    pub traverse: Vec<Label>,

    /// Maximum inheritance depth (`None` = unbounded).
    pub max_inheritance_depth: Option<usize>,

    /// Re-verify every index after each mutation.
    pub verify_indices: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            traverse: vec![Label::IsA],
            max_inheritance_depth: None,
            verify_indices: false,
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration with inheritance disabled.
    #[must_use]
    pub fn without_inheritance() -> Self {
        Self {
            traverse: Vec::new(),
            ..Self::default()
        }
    }

    /// Creates a configuration that verifies every index after each mutation.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            verify_indices: true,
            ..Self::default()
        }
    }

    /// Builder method to set the traversal labels.
    #[must_use]
    pub fn with_traverse(mut self, traverse: impl IntoIterator<Item = Label>) -> Self {
        self.traverse = traverse.into_iter().collect();
        self
    }

    /// Builder method to set the maximum inheritance depth.
    #[must_use]
    pub fn with_max_inheritance_depth(mut self, depth: Option<usize>) -> Self {
        self.max_inheritance_depth = depth;
        self
    }

    /// Builder method to enable/disable index verification.
    #[must_use]
    pub fn with_verify_indices(mut self, verify: bool) -> Self {
        self.verify_indices = verify;
        self
    }
}
