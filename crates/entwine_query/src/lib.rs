//! Declarative queries and the caching query engine for entwine.
//!
//! This crate provides:
//! - [`Query`] / [`Terms`] - Immutable query trees built from clauses
//! - [`RelationPattern`] - Relation atoms with entity, wildcard, or nested-query ends
//! - [`QueryEngine`] - Evaluation with per-node, version-checked caching
//! - [`Column`] - Shaped row output with inherited component values

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod pattern;
pub mod query;

pub use config::QueryConfig;
pub use engine::{Column, QueryEngine, QueryStats};
pub use pattern::{RelationPattern, Target, Term};
pub use query::{Node, Query, Terms};
