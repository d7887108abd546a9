//! Scoped unit-of-work management for entity persistence.
//! Decides per call who owns a persistence handle and guarantees release of
//! every handle the service creates itself.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, ConfigResult, StoreConfig, TransactionMode};
pub use context::{HandleError, HandleFactory, HandleResult, PersistenceHandle};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityId, EntityValidationError};
pub use service::guard::HandleGuard;
pub use service::scoped_service::{ScopedService, AMBIENT_FLUSH_DEFAULT, EPHEMERAL_FLUSH_DEFAULT};
pub use store::{EntityListQuery, SqliteContext, SqliteContextFactory};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
