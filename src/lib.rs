//! Entwine - Indexed entity-component-relation store
//!
//! This crate re-exports all layers of the entwine system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: entwine_query      - Query trees, relation patterns, cached evaluation
//! Layer 1: entwine_storage    - Identity table, indices, inheritance, hooks
//! Layer 0: entwine_foundation - Core types (Value, EntityId, keys, Error)
//! ```
//!
//! # Example
//!
//! ```
//! use entwine::foundation::{ComponentKey, Label, Type, Value};
//! use entwine::query::{Query, QueryEngine, RelationPattern, Terms};
//! use entwine::storage::Registry;
//!
//! let mut registry = Registry::new();
//! let star = registry.entity("star");
//! let planet = registry.entity("planet");
//! let moon = registry.entity("moon");
//! let dist = ComponentKey::named("dist", Type::Int);
//! registry.set_relation_component(planet, dist.clone(), star, Value::Int(1000))?;
//! registry.set_relation_component(moon, dist.clone(), planet, Value::Int(10))?;
//!
//! let orbiting_planet = Query::new()
//!     .all_of(Terms::new().relation(RelationPattern::origins(Label::from(dist), planet)))?;
//! let mut engine = QueryEngine::new();
//! assert_eq!(engine.get_entities(&registry, &orbiting_planet).len(), 1);
//! assert!(engine.get_entities(&registry, &orbiting_planet).contains(&moon));
//! # Ok::<(), entwine::foundation::Error>(())
//! ```

pub use entwine_foundation as foundation;
pub use entwine_query as query;
pub use entwine_storage as storage;
