//! Scoped service over one handle factory.
//!
//! # Responsibility
//! - Hand out new handles whose release the caller owns.
//! - Run operations against either a caller-supplied handle or a fresh,
//!   service-owned one that is released before the call returns.
//!
//! # Invariants
//! - `get_handle*` never releases what it returns.
//! - `run_with_handle*` with `Some(handle)` never calls the factory and
//!   never touches the handle's flush flag.
//! - `run_with_handle*` with `None` calls the factory exactly once and
//!   releases that handle exactly once, whatever the operation does.
//! - Operation errors are returned unchanged.

use crate::config::{ConfigError, ConfigResult};
use crate::context::{HandleError, HandleFactory, HandleResult, PersistenceHandle};
use crate::service::guard::HandleGuard;
use log::{debug, error};
use std::time::Instant;

/// Flush default for handles returned by `get_handle`.
pub const AMBIENT_FLUSH_DEFAULT: bool = false;
/// Flush default for handles created by `run_with_handle`.
pub const EPHEMERAL_FLUSH_DEFAULT: bool = true;

/// Stateless unit-of-work coordinator bound to one handle factory.
pub struct ScopedService<F: HandleFactory> {
    factory: F,
}

impl<F: HandleFactory> ScopedService<F> {
    /// Binds the service to a factory.
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Binds the service to an optional factory.
    ///
    /// # Errors
    /// - `ConfigError::MissingFactory` when `factory` is `None`.
    pub fn try_new(factory: Option<F>) -> ConfigResult<Self> {
        match factory {
            Some(factory) => Ok(Self::new(factory)),
            None => {
                error!(
                    "event=service_init module=service status=error error_code=missing_factory"
                );
                Err(ConfigError::MissingFactory)
            }
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Creates a handle with `flush_on_release = false`. The caller owns
    /// its release.
    pub fn get_handle(&self) -> HandleResult<F::Handle> {
        self.get_handle_with_flush(AMBIENT_FLUSH_DEFAULT)
    }

    /// Creates a handle with the given flush flag. The caller owns its
    /// release. Factory errors are returned unchanged.
    pub fn get_handle_with_flush(&self, flush_on_release: bool) -> HandleResult<F::Handle> {
        let started_at = Instant::now();
        match self.factory.create() {
            Ok(mut handle) => {
                handle.set_flush_on_release(flush_on_release);
                debug!(
                    "event=handle_create module=service status=ok flush={} duration_ms={}",
                    flush_on_release,
                    started_at.elapsed().as_millis()
                );
                Ok(handle)
            }
            Err(err) => {
                error!(
                    "event=handle_create module=service status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Creates a handle already wrapped in a release guard.
    ///
    /// Convenient for ambient owners that thread one handle through several
    /// calls and want release on every exit path of their own scope.
    pub fn get_scoped_handle(&self, flush_on_release: bool) -> HandleResult<HandleGuard<F::Handle>> {
        self.get_handle_with_flush(flush_on_release)
            .map(HandleGuard::new)
    }

    /// Runs `operation` with flush-on-release enabled for ephemeral handles.
    ///
    /// See [`ScopedService::run_with_handle_flush`].
    pub fn run_with_handle<T, E, Op>(
        &self,
        handle: Option<&mut F::Handle>,
        operation: Op,
    ) -> Result<T, E>
    where
        Op: FnOnce(&mut F::Handle) -> Result<T, E>,
        E: From<HandleError>,
    {
        self.run_with_handle_flush(handle, EPHEMERAL_FLUSH_DEFAULT, operation)
    }

    /// Runs `operation` against `handle`, or against a service-owned handle
    /// when `handle` is `None`.
    ///
    /// # Contract
    /// - `Some(handle)`: the operation runs on it directly; `flush_on_release`
    ///   is ignored and nothing is created or released.
    /// - `None`: one handle is created with `flush_on_release`, the operation
    ///   runs, and the handle is released before returning. If the operation
    ///   fails the handle is still released and the operation's error is
    ///   returned unchanged. A panic releases the handle during unwinding.
    ///
    /// # Errors
    /// - Factory failures, converted through `E: From<HandleError>`; the
    ///   operation is not invoked.
    /// - The operation's own error.
    /// - A release failure after a successful operation.
    pub fn run_with_handle_flush<T, E, Op>(
        &self,
        handle: Option<&mut F::Handle>,
        flush_on_release: bool,
        operation: Op,
    ) -> Result<T, E>
    where
        Op: FnOnce(&mut F::Handle) -> Result<T, E>,
        E: From<HandleError>,
    {
        if let Some(handle) = handle {
            debug!("event=run_with_handle module=service status=start ownership=ambient");
            return operation(handle);
        }

        let started_at = Instant::now();
        debug!(
            "event=run_with_handle module=service status=start ownership=ephemeral flush={}",
            flush_on_release
        );
        let mut guard = self.get_scoped_handle(flush_on_release)?;

        match operation(guard.handle_mut()) {
            Ok(value) => {
                guard.release()?;
                debug!(
                    "event=run_with_handle module=service status=ok ownership=ephemeral duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                // The operation's error wins; the guard already logged any
                // release failure.
                let _ = guard.release();
                debug!(
                    "event=run_with_handle module=service status=error ownership=ephemeral duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}
