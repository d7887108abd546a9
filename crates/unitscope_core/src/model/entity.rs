//! Entity trait and validation helpers.
//!
//! # Responsibility
//! - Describe the minimal shape a record needs to be stored by a handle.
//! - Validate kind names and entity-specific invariants before writes.
//!
//! # Invariants
//! - `Entity::KIND` matches `^[a-z][a-z0-9_]*$` and is at most 64 chars.
//! - Write paths call `Entity::validate()` before any SQL mutation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every persisted entity.
pub type EntityId = Uuid;

const MAX_KIND_CHARS: usize = 64;

static KIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid kind regex"));

/// Validation failures raised before an entity reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    /// `Entity::KIND` is empty, too long, or not snake_case.
    InvalidKind(String),
    /// The entity id is the nil UUID.
    NilId,
    /// Entity-specific invariant violation.
    Invalid { field: &'static str, reason: String },
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(kind) => write!(
                f,
                "entity kind `{kind}` must match [a-z][a-z0-9_]* and be at most {MAX_KIND_CHARS} chars"
            ),
            Self::NilId => write!(f, "entity id cannot be nil"),
            Self::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl Error for EntityValidationError {}

/// A record type a persistence handle can be bound to.
///
/// Implementors only describe identity and serialization; storage layout is
/// owned by the handle implementation.
pub trait Entity: Serialize + DeserializeOwned {
    /// Storage key for this entity type.
    const KIND: &'static str;

    /// Returns the stable id of this record.
    fn id(&self) -> EntityId;

    /// Checks entity-specific invariants. Defaults to accepting everything.
    fn validate(&self) -> Result<(), EntityValidationError> {
        Ok(())
    }
}

/// Validates a kind name against storage key rules.
pub fn validate_kind(kind: &str) -> Result<(), EntityValidationError> {
    if kind.chars().count() > MAX_KIND_CHARS || !KIND_RE.is_match(kind) {
        return Err(EntityValidationError::InvalidKind(kind.to_string()));
    }
    Ok(())
}

/// Runs every write-path check for one entity.
pub fn validate_entity<E: Entity>(entity: &E) -> Result<(), EntityValidationError> {
    validate_kind(E::KIND)?;
    if entity.id().is_nil() {
        return Err(EntityValidationError::NilId);
    }
    entity.validate()
}
