//! Type-erased task storage for schedulers.
//!
//! A [`Scheduler`](crate::Scheduler) holds tasks with different output types in a
//! single collection. The public API stays typed through [`Task<V>`](crate::Task);
//! erasure happens only at this trait boundary.

use std::sync::Arc;

use crate::outcome::Failure;
use crate::scheduler::Scheduler;
use crate::types::{TaskId, TaskState};

/// Callback run once when a task settles (finishes or is cancelled).
pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Internal trait for driving heterogeneous tasks.
///
/// This is an implementation detail and not part of the public API.
pub(crate) trait Schedulable: Send + Sync {
    fn id(&self) -> TaskId;

    fn state(&self) -> TaskState;

    /// Tasks that must settle before this one may start.
    ///
    /// Emptied once the task leaves `Ready`, so settled tasks do not keep
    /// their upstream alive.
    fn dependencies(&self) -> Vec<Arc<dyn Schedulable>>;

    /// Give the task a child of `parent` for nested work.
    fn adopt(&self, parent: &Scheduler);

    /// Move `Ready → Executing` and invoke the task's function.
    ///
    /// `owner` is kept alive until the task settles so that dependents can still
    /// be dispatched after every pipeline handle is dropped. Returns false when
    /// the task was not eligible.
    fn start(self: Arc<Self>, owner: Option<Scheduler>) -> bool;

    fn cancel(&self);

    /// Settle a task that never reached a lane with `failure`.
    fn fail_to_launch(&self, failure: Failure);

    /// Register `callback` to run when the task settles; runs it immediately if
    /// the task has already settled.
    fn on_settled(&self, callback: Callback);
}
