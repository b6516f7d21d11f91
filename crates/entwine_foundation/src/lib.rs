//! Core values, keys, identifiers, and errors for entwine.
//!
//! This crate provides:
//! - [`Value`] - Dynamic payload type for components, tags, and uids
//! - [`EntityId`] / [`Uid`] - Generational entity handles and caller identities
//! - [`ComponentKey`] / [`Label`] - Index keys for components and relations
//! - [`Type`] - Type descriptors used as component kinds
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`LtVec`], [`LtSet`], [`LtMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod key;
pub mod types;
pub mod value;

pub use collections::{LtMap, LtSet, LtVec};
pub use entity::{EntityId, Uid};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use key::{ComponentKey, IndexKey, Label};
pub use types::Type;
pub use value::Value;
