//! Per-execution-context scope activations.
//!
//! Outside a tokio runtime each thread has its own set of active scopes.
//! Inside one, a thread is shared by many tasks, so only futures wrapped in
//! [`isolated`] or [`fork`] get a set (kept in a tokio task-local). Code
//! running on a runtime without one sees no active scopes and cannot start
//! any.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

use tokio::runtime::Handle;

use crate::schema::SchemaId;
use crate::scope::storage::Slots;

/// Active scope storages by schema.
#[derive(Clone, Default)]
pub(crate) struct ContextSlots {
    active: HashMap<SchemaId, Slots>,
}

impl ContextSlots {
    pub(crate) fn get(&self, schema: SchemaId) -> Option<Slots> {
        self.active.get(&schema).cloned()
    }

    /// Replace the storage of `schema`, returning the previous one.
    pub(crate) fn set(&mut self, schema: SchemaId, slots: Option<Slots>) -> Option<Slots> {
        match slots {
            Some(slots) => self.active.insert(schema, slots),
            None => self.active.remove(&schema),
        }
    }
}

tokio::task_local! {
    static TASK_CONTEXT: RefCell<ContextSlots>;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<ContextSlots> = RefCell::new(ContextSlots::default());
}

/// Run `f` on the current context, or return `None` on a runtime thread
/// with no task context.
pub(crate) fn with_context<R>(f: impl FnOnce(&mut ContextSlots) -> R) -> Option<R> {
    if TASK_CONTEXT.try_with(|_| ()).is_ok() {
        Some(TASK_CONTEXT.with(|cell| f(&mut cell.borrow_mut())))
    } else if Handle::try_current().is_ok() {
        None
    } else {
        Some(THREAD_CONTEXT.with(|cell| f(&mut cell.borrow_mut())))
    }
}

/// Run `fut` with no active scopes of its own.
pub fn isolated<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    TASK_CONTEXT.scope(RefCell::new(ContextSlots::default()), fut)
}

/// Run `fut` with a snapshot of the caller's active scopes.
///
/// Storages active at the call are shared with the caller; scopes started or
/// stopped inside `fut` do not leak back.
pub fn fork<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    let snapshot = with_context(|ctx| ctx.clone()).unwrap_or_default();
    TASK_CONTEXT.scope(RefCell::new(snapshot), fut)
}

/// Synchronous counterpart of [`isolated`].
pub fn isolated_sync<R>(f: impl FnOnce() -> R) -> R {
    TASK_CONTEXT.sync_scope(RefCell::new(ContextSlots::default()), f)
}
