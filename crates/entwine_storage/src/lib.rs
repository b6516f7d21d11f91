//! Identity table, attribute indices, and inheritance resolution for entwine.
//!
//! This crate provides:
//! - [`EntityTable`] - Canonical uid to generational handle mapping
//! - [`ComponentIndex`] / [`TagIndex`] / [`RelationIndex`] - Bidirectional indices
//! - [`Resolver`] - Breadth-first is-a lineage walks
//! - [`Registry`] - The store tying them together, with versions and hooks
//! - [`Snapshot`] - Structural copies for external serialization

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod hooks;
pub mod identity;
pub mod inherit;
pub mod registry;
pub mod relation;
pub mod schema;
pub mod snapshot;
pub mod tag;
pub mod version;

pub use component::ComponentIndex;
pub use config::RegistryConfig;
pub use hooks::{ComponentChange, HookId};
pub use identity::EntityTable;
pub use inherit::Resolver;
pub use registry::{Registry, RegistryId};
pub use relation::{Edge, RelationIndex};
pub use schema::{Multiplicity, OnDestroy, RelationSchema};
pub use snapshot::Snapshot;
pub use tag::TagIndex;
pub use version::VersionTable;
