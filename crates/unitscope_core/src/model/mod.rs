//! Entity contract shared by handles and services.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Entity kind names are stable storage keys and must never be renamed.

pub mod entity;
