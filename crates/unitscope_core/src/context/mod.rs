//! Persistence handle contracts.
//!
//! # Responsibility
//! - Define what a unit-of-work handle must offer to the scoped service.
//! - Define the factory seam through which handles are created.
//! - Provide the shared `HandleError` taxonomy for handles and factories.
//!
//! # Invariants
//! - A handle is released at most once; `release` consumes it.
//! - Creation failures are always reported as `HandleError::Creation`.

use crate::db::DbError;
use crate::model::entity::{EntityId, EntityValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod factory;
mod handle;

pub use factory::HandleFactory;
pub use handle::PersistenceHandle;

pub type HandleResult<T> = Result<T, HandleError>;

/// Errors raised by handle factories and by handles themselves.
#[derive(Debug)]
pub enum HandleError {
    /// The factory could not produce a handle (storage unreachable or
    /// misconfigured).
    Creation(Box<dyn Error + Send + Sync + 'static>),
    /// Storage failure while the handle was in use or being released.
    Db(DbError),
    Validation(EntityValidationError),
    Serialization(serde_json::Error),
    NotFound {
        kind: &'static str,
        id: EntityId,
    },
    Duplicate {
        kind: &'static str,
        id: EntityId,
    },
    /// Persisted row could not be decoded.
    InvalidData(String),
}

impl HandleError {
    /// Wraps any backend failure as a handle creation error.
    pub fn creation(err: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Creation(err.into())
    }

    pub fn is_creation(&self) -> bool {
        matches!(self, Self::Creation(_))
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Creation(_) => "handle_creation_failed",
            Self::Db(_) => "db_error",
            Self::Validation(_) => "validation_failed",
            Self::Serialization(_) => "serialization_failed",
            Self::NotFound { .. } => "not_found",
            Self::Duplicate { .. } => "duplicate",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for HandleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation(err) => write!(f, "failed to create persistence handle: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "entity serialization failed: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Duplicate { kind, id } => write!(f, "{kind} already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entity data: {message}"),
        }
    }
}

impl Error for HandleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Creation(err) => Some(err.as_ref()),
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound { .. } | Self::Duplicate { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for HandleError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HandleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntityValidationError> for HandleError {
    fn from(value: EntityValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for HandleError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

#[cfg(test)]
mod tests {
    use super::HandleError;
    use crate::db::DbError;
    use std::error::Error;

    #[test]
    fn creation_keeps_source_and_code() {
        let err = HandleError::creation("storage offline");
        assert!(err.is_creation());
        assert_eq!(err.code(), "handle_creation_failed");
        assert!(err.to_string().contains("storage offline"));
        assert!(err.source().is_some());
    }

    #[test]
    fn db_errors_are_not_creation_errors() {
        let err = HandleError::from(DbError::UnsupportedSchemaVersion {
            found: 9,
            supported: 1,
        });
        assert!(!err.is_creation());
        assert_eq!(err.code(), "db_error");
    }
}
