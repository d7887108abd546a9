//! Scoped unit-of-work services.
//!
//! # Responsibility
//! - Decide per call whether a handle is ambient (caller-owned) or
//!   ephemeral (service-owned).
//! - Guarantee release of every service-created handle on all exit paths.
//!
//! # Invariants
//! - Caller-supplied handles are never created, flagged or released here.
//! - Ephemeral handles are released exactly once, before the call returns.

pub mod guard;
pub mod scoped_service;
