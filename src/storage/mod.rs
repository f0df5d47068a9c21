//! Document Store Module
//!
//! The in-process implementation of the store adapter the core runs against.
//!
//! ## Core Concepts
//! - **Collections**: Named maps of string id -> document, one per entity kind.
//! - **Versions**: Every document carries a version bumped on each write.
//! - **Optimistic updates**: Read-modify-write goes through `Collection::update`,
//!   which re-reads and retries when another writer got there first, instead of
//!   silently overwriting a concurrent change.

pub mod collection;
pub mod store;

pub use collection::{Collection, Versioned};
pub use store::Store;
