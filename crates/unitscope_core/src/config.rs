//! Store configuration and validation.
//!
//! # Responsibility
//! - Describe where the SQLite reference store lives and how handles open
//!   their unit-of-work transaction.
//! - Reject unusable configuration before any handle is created.
//!
//! # Invariants
//! - `StoreConfig::db_path` is non-empty and absolute.
//! - `StoreConfig::busy_timeout_ms` stays within `1..=MAX_BUSY_TIMEOUT_MS`.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors. Fatal at construction time and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Service was constructed without a handle factory.
    MissingFactory,
    EmptyDatabasePath,
    RelativeDatabasePath(PathBuf),
    InvalidBusyTimeout(u64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFactory => write!(f, "scoped service requires a handle factory"),
            Self::EmptyDatabasePath => write!(f, "database path cannot be empty"),
            Self::RelativeDatabasePath(path) => write!(
                f,
                "database path must be absolute, got `{}`",
                path.display()
            ),
            Self::InvalidBusyTimeout(value) => write!(
                f,
                "busy timeout must be within 1..={MAX_BUSY_TIMEOUT_MS} ms, got {value}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// How a handle opens its unit-of-work transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// `BEGIN DEFERRED`: the write lock is taken on the first write, so
    /// read-only handles never block other handles.
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`: the write lock is taken when the handle opens and
    /// held until release.
    Immediate,
}

impl TransactionMode {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            Self::Deferred => "BEGIN DEFERRED;",
            Self::Immediate => "BEGIN IMMEDIATE;",
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Immediate => "immediate",
        }
    }
}

/// Validated configuration for the SQLite reference store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawStoreConfig")]
pub struct StoreConfig {
    db_path: PathBuf,
    transaction_mode: TransactionMode,
    busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Creates a config with default transaction mode and busy timeout.
    ///
    /// # Errors
    /// - `EmptyDatabasePath` when `db_path` is blank.
    /// - `RelativeDatabasePath` when `db_path` is not absolute.
    pub fn new(db_path: impl AsRef<Path>) -> ConfigResult<Self> {
        Ok(Self {
            db_path: normalize_db_path(db_path.as_ref())?,
            transaction_mode: TransactionMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        })
    }

    pub fn with_transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.transaction_mode = mode;
        self
    }

    /// Overrides the SQLite busy timeout.
    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> ConfigResult<Self> {
        self.busy_timeout_ms = validate_busy_timeout(busy_timeout_ms)?;
        Ok(self)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn transaction_mode(&self) -> TransactionMode {
        self.transaction_mode
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Deserialize)]
struct RawStoreConfig {
    db_path: PathBuf,
    #[serde(default)]
    transaction_mode: TransactionMode,
    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u64,
}

impl TryFrom<RawStoreConfig> for StoreConfig {
    type Error = ConfigError;

    fn try_from(raw: RawStoreConfig) -> ConfigResult<Self> {
        StoreConfig::new(raw.db_path)?
            .with_transaction_mode(raw.transaction_mode)
            .with_busy_timeout_ms(raw.busy_timeout_ms)
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn normalize_db_path(path: &Path) -> ConfigResult<PathBuf> {
    let text = path.to_string_lossy();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyDatabasePath);
    }
    let path = PathBuf::from(trimmed);
    if !path.is_absolute() {
        return Err(ConfigError::RelativeDatabasePath(path));
    }
    Ok(path)
}

fn validate_busy_timeout(value: u64) -> ConfigResult<u64> {
    if value == 0 || value > MAX_BUSY_TIMEOUT_MS {
        return Err(ConfigError::InvalidBusyTimeout(value));
    }
    Ok(value)
}
