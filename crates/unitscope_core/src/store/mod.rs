//! SQLite reference implementation of the handle contracts.
//!
//! # Responsibility
//! - Provide a concrete `HandleFactory` and `PersistenceHandle` pair backed
//!   by one SQLite connection and transaction per handle.
//! - Store entities of any `Entity` type as JSON bodies keyed by kind + id.
//!
//! # Invariants
//! - Every query is scoped to the handle's `Entity::KIND`.
//! - A handle holds an open transaction from creation until release.
//! - Release commits when `flush_on_release` is set and rolls back otherwise.

mod context;
mod factory;

pub use context::{EntityListQuery, SqliteContext};
pub use factory::SqliteContextFactory;
