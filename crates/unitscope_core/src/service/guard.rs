//! Scope guard that owns one persistence handle.
//!
//! # Invariants
//! - The wrapped handle is released exactly once: by `release()` or, when the
//!   guard is dropped without it (early return, panic unwind), by `Drop`.
//! - Release on drop cannot report errors, so failures are logged.

use crate::context::{HandleResult, PersistenceHandle};
use log::{debug, error, warn};
use std::ops::{Deref, DerefMut};

/// Owns a handle for the duration of a scope and releases it on exit.
pub struct HandleGuard<H: PersistenceHandle> {
    handle: Option<H>,
}

impl<H: PersistenceHandle> HandleGuard<H> {
    pub fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn handle(&self) -> &H {
        self.handle
            .as_ref()
            .expect("handle present until guard is consumed")
    }

    pub fn handle_mut(&mut self) -> &mut H {
        self.handle
            .as_mut()
            .expect("handle present until guard is consumed")
    }

    /// Releases the handle now and reports the release outcome.
    pub fn release(mut self) -> HandleResult<()> {
        match self.handle.take() {
            Some(handle) => release_handle(handle, "explicit"),
            None => Ok(()),
        }
    }

    /// Takes the handle out of the guard; the caller becomes its owner.
    pub fn into_inner(mut self) -> H {
        self.handle
            .take()
            .expect("handle present until guard is consumed")
    }
}

impl<H: PersistenceHandle> Deref for HandleGuard<H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.handle()
    }
}

impl<H: PersistenceHandle> DerefMut for HandleGuard<H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle_mut()
    }
}

impl<H: PersistenceHandle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if std::thread::panicking() {
            warn!("event=handle_release module=service status=start trigger=unwind");
        }
        let _ = release_handle(handle, "drop");
    }
}

fn release_handle<H: PersistenceHandle>(handle: H, trigger: &str) -> HandleResult<()> {
    let flush = handle.flush_on_release();
    match handle.release() {
        Ok(()) => {
            debug!(
                "event=handle_release module=service status=ok trigger={} flush={}",
                trigger, flush
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=handle_release module=service status=error trigger={} flush={} error_code={} error={}",
                trigger,
                flush,
                err.code(),
                err
            );
            Err(err)
        }
    }
}
