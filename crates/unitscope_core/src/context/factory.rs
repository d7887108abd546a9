use super::{HandleResult, PersistenceHandle};
use std::sync::Arc;

/// Produces ready-to-use persistence handles bound to one entity type.
///
/// # Contract
/// - `create` returns a handle usable immediately for reads and writes, or
///   `HandleError::Creation` when storage is unreachable or misconfigured.
/// - No side effects beyond opening the state the handle needs.
pub trait HandleFactory {
    type Handle: PersistenceHandle;

    fn create(&self) -> HandleResult<Self::Handle>;
}

impl<F: HandleFactory + ?Sized> HandleFactory for &F {
    type Handle = F::Handle;

    fn create(&self) -> HandleResult<Self::Handle> {
        (**self).create()
    }
}

impl<F: HandleFactory + ?Sized> HandleFactory for Arc<F> {
    type Handle = F::Handle;

    fn create(&self) -> HandleResult<Self::Handle> {
        (**self).create()
    }
}
