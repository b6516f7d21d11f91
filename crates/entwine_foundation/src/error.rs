//! Error types for entwine.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::Type;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for entwine operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a lookup failure for `what` on `entity`.
    #[must_use]
    pub fn not_found(entity: EntityId, what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound {
            entity,
            what: what.into(),
        })
    }

    /// Creates a malformed query error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery(message.into()))
    }

    /// Creates an inheritance cycle error.
    #[must_use]
    pub fn cycle_detected(entity: EntityId, path: Vec<EntityId>) -> Self {
        Self::new(ErrorKind::CycleDetected { entity, path })
    }

    /// Creates an internal consistency error.
    #[must_use]
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation(message.into()))
    }

    /// Creates an error for an exclusive read of a multi-target relation.
    #[must_use]
    pub fn not_exclusive(entity: EntityId, label: impl Into<String>, count: usize) -> Self {
        Self::new(ErrorKind::NotExclusive {
            entity,
            label: label.into(),
            count,
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a stale entity reference error.
    #[must_use]
    pub fn stale_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::StaleEntity(id))
    }

    /// Creates a relation schema conflict error.
    #[must_use]
    pub fn schema_conflict(label: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaConflict(label.into()))
    }

    /// Wraps an error returned by a change hook.
    #[must_use]
    pub fn hook_failed(source: Error) -> Self {
        Self::new(ErrorKind::HookFailed(Box::new(source)))
    }

    /// Creates an error raised from inside a change hook.
    #[must_use]
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook(message.into()))
    }

    /// Returns true if this is a `NotFound` error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound { .. })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A local or inherited lookup found nothing.
    #[error("not found: {what} on {entity:?}")]
    NotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// The component, tag, or relation that was missing.
        what: String,
    },

    /// A query was structurally malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Inheritance resolution revisited an entity on its own path.
    #[error("inheritance cycle through {entity:?} (path {path:?})")]
    CycleDetected {
        /// The entity reached twice.
        entity: EntityId,
        /// Resolution path leading to the revisit.
        path: Vec<EntityId>,
    },

    /// Internal index consistency check failed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An exclusive read found several targets.
    #[error("{label} on {entity:?} has {count} targets, expected one")]
    NotExclusive {
        /// Origin of the relation.
        entity: EntityId,
        /// The relation label.
        label: String,
        /// Number of targets found.
        count: usize,
    },

    /// Type mismatch on a component write.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: Type,
        /// The actual type encountered.
        actual: Type,
    },

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity reference is stale (generation mismatch).
    #[error("stale entity reference: {0:?}")]
    StaleEntity(EntityId),

    /// A relation schema was registered twice.
    #[error("relation schema already registered: {0}")]
    SchemaConflict(String),

    /// A change hook returned an error.
    #[error("change hook failed: {0}")]
    HookFailed(Box<Error>),

    /// Error raised by user code inside a change hook.
    #[error("{0}")]
    Hook(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation that failed.
    pub operation: Option<String>,
    /// Chain of entities or keys involved, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operation: None,
            stack: Vec::new(),
        }
    }

    /// Sets the failing operation.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "in {operation}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  at {frame}")?;
            }
        }
        Ok(())
    }
}
