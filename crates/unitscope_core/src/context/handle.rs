use super::HandleResult;

/// One open unit-of-work against storage.
///
/// # Contract
/// - `flush_on_release` defaults to `false` for freshly created handles.
/// - `release` persists accumulated changes when `flush_on_release` is set
///   and discards them otherwise, then closes the handle.
/// - Whoever created or was handed the handle owns the single `release`
///   call.
pub trait PersistenceHandle: Sized {
    fn flush_on_release(&self) -> bool;

    fn set_flush_on_release(&mut self, flush: bool);

    /// Ends the unit-of-work. Consumes the handle so it cannot be released
    /// twice.
    fn release(self) -> HandleResult<()>;
}
