//! Tasks and their state machine.
//!
//! A [`Task<V>`] wraps a user function that receives a [`Settler<V>`] and settles
//! the task exactly once, either by fulfilling it with a value or rejecting it
//! with a [`Failure`]. The function may settle synchronously or hand the settler
//! to another thread and settle later.
//!
//! ```text
//! Ready ──start──▶ Executing ──fulfill/reject──▶ Finished
//!   │                  │
//!   └────cancel────────┴──────────────────────▶ Cancelled
//! ```
//!
//! A task its lane refuses to run passes through `Executing` and is rejected
//! with the lane's [`TaskError`].
//!
//! Each task owns a private child [`Scheduler`] for work its function submits
//! while executing (see [`Settler::scheduler`]). The child is resumed when the
//! task starts and cancelled before the task itself is cancelled.

use std::any::Any;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{error, trace};

use crate::config::SchedulerConfig;
use crate::error::TaskError;
use crate::node::{Callback, Schedulable};
use crate::outcome::{Failure, Outcome};
use crate::scheduler::Scheduler;
use crate::types::{Lane, TaskId, TaskState};

type Work<V> = Box<dyn FnOnce(Settler<V>) + Send + 'static>;

/// A one-shot unit of work with a settle-once [`Outcome`].
///
/// `Task` is a cheap handle; clones refer to the same task.
///
/// # Examples
///
/// ```
/// use tasklane::{Outcome, Task, TaskState};
///
/// let task = Task::new(|settler| {
///     settler.fulfill(99);
/// });
///
/// assert!(task.start());
/// assert_eq!(task.state(), TaskState::Finished);
/// assert_eq!(task.output(), Some(Outcome::Success(99)));
/// ```
pub struct Task<V> {
    pub(crate) core: Arc<TaskCore<V>>,
}

impl<V> Clone for Task<V> {
    fn clone(&self) -> Self {
        Task {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V> std::fmt::Debug for Task<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("state", &self.core.slot.lock().state)
            .finish()
    }
}

impl<V: Clone + Send + 'static> Task<V> {
    /// Create a task from a function that settles it through a [`Settler`].
    ///
    /// The function runs once, when the task starts. It may call
    /// [`Settler::fulfill`] or [`Settler::reject`] before returning, or move
    /// the settler elsewhere and settle later.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce(Settler<V>) + Send + 'static,
    {
        Task {
            core: Arc::new(TaskCore {
                id: TaskId::next(),
                slot: Mutex::new(Slot {
                    state: TaskState::Ready,
                    output: None,
                    work: Some(Box::new(work)),
                    on_cancel: None,
                    watchers: Vec::new(),
                    dependencies: Vec::new(),
                    child: None,
                    owner: None,
                }),
            }),
        }
    }

    /// A task that fulfills with `value` as soon as it starts.
    pub fn from_value(value: V) -> Self {
        Task::new(move |settler| {
            settler.fulfill(value);
        })
    }

    pub fn id(&self) -> TaskId {
        self.core.id
    }

    pub fn state(&self) -> TaskState {
        self.core.slot.lock().state
    }

    /// The task's outcome, once it has finished.
    ///
    /// Always `None` for a cancelled task.
    pub fn output(&self) -> Option<Outcome<V>> {
        self.core.output()
    }

    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Declare that this task may only start after `dependency` settles.
    ///
    /// Dependencies must be declared before the task is submitted to a
    /// scheduler; later declarations only affect [`Task::start`].
    pub fn depends_on<U: Clone + Send + 'static>(&self, dependency: &Task<U>) {
        let dependency: Arc<dyn Schedulable> = dependency.core.clone();
        self.core.slot.lock().dependencies.push(dependency);
    }

    /// Start the task outside of any scheduler.
    ///
    /// Returns false, without running anything, unless the task is `Ready` and
    /// all of its dependencies have settled.
    pub fn start(&self) -> bool {
        Arc::clone(&self.core).start(None)
    }

    /// Cancel the task.
    ///
    /// No effect on a task that has already finished or been cancelled. A task
    /// that was executing has its cancellation hook invoked.
    pub fn cancel(&self) {
        Schedulable::cancel(&*self.core);
    }

    /// Register `callback` to receive the task's outcome when it settles.
    ///
    /// The callback receives `None` if the task is cancelled. It runs
    /// immediately when the task has already settled.
    pub fn on_settled<F>(&self, callback: F)
    where
        F: FnOnce(Option<Outcome<V>>) + Send + 'static,
    {
        let core = Arc::downgrade(&self.core);
        self.core.on_settled(Box::new(move || {
            let output = core.upgrade().and_then(|core| core.output());
            callback(output)
        }));
    }

    /// Wait for the task to settle.
    ///
    /// Resolves to `None` if the task is cancelled. The future never resolves
    /// for a task that never settles.
    pub fn settled(&self) -> impl Future<Output = Option<Outcome<V>>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.on_settled(move |output| {
            let _ = tx.send(output);
        });
        async move { rx.await.ok().flatten() }
    }

    /// Chain a value continuation run after this task finishes.
    ///
    /// The continuation is submitted to this task's child scheduler, so it only
    /// runs once this task has been started, and is cancelled with it.
    pub fn then<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> U + Send + 'static,
    {
        let next = map_continuation(self, f);
        self.core.child().submit(&next, None);
        next
    }

    /// Chain a continuation that produces another task, settling with that
    /// task's outcome.
    pub fn then_task<U, F>(&self, f: F) -> Task<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> Task<U> + Send + 'static,
    {
        let next = flat_map_continuation(self, None, f);
        self.core.child().submit(&next, None);
        next
    }
}

/// Settles a running [`Task`].
///
/// Handed to the task's function when it starts. Clones settle the same task;
/// only the first `fulfill`/`reject` takes effect.
pub struct Settler<V> {
    core: Arc<TaskCore<V>>,
}

impl<V> Clone for Settler<V> {
    fn clone(&self) -> Self {
        Settler {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V: Clone + Send + 'static> Settler<V> {
    pub fn task_id(&self) -> TaskId {
        self.core.id
    }

    /// Finish the task with `value`. Returns false if the task had already
    /// settled.
    pub fn fulfill(&self, value: V) -> bool {
        self.core.settle(Outcome::Success(value))
    }

    /// Finish the task with `failure`. Returns false if the task had already
    /// settled.
    pub fn reject(&self, failure: impl Into<Failure>) -> bool {
        self.core.settle(Outcome::Failure(failure.into()))
    }

    pub fn settle(&self, outcome: Outcome<V>) -> bool {
        self.core.settle(outcome)
    }

    /// Set the hook invoked if the task is cancelled before it finishes.
    ///
    /// Replaces any previous hook. If the task has already been cancelled the
    /// hook runs immediately; once the task has finished it is never run.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.core.slot.lock();
        match slot.state {
            TaskState::Ready | TaskState::Executing => slot.on_cancel = Some(Box::new(hook)),
            TaskState::Cancelled => {
                drop(slot);
                hook();
            }
            TaskState::Finished => {}
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.slot.lock().state == TaskState::Cancelled
    }

    /// Cancel the task from inside its own function.
    pub fn cancel(&self) {
        Schedulable::cancel(&*self.core);
    }

    /// The task's child scheduler, for nested tasks.
    ///
    /// Tasks submitted here are cancelled when this task is cancelled.
    pub fn scheduler(&self) -> Scheduler {
        self.core.child()
    }

    /// Settle this task with whatever `inner` eventually settles with.
    ///
    /// If `inner` is cancelled, this task is cancelled too.
    pub fn forward(&self, inner: &Task<V>) {
        let settler = self.clone();
        inner.on_settled(move |output| match output {
            Some(outcome) => {
                settler.settle(outcome);
            }
            None => settler.cancel(),
        });
    }
}

/// Build a dependent task applying `f` to `tail`'s success value.
pub(crate) fn map_continuation<V, U, F>(tail: &Task<V>, f: F) -> Task<U>
where
    V: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(V) -> U + Send + 'static,
{
    let source = tail.clone();
    let next = Task::new(move |settler: Settler<U>| match source.output() {
        Some(Outcome::Success(value)) => {
            settler.fulfill(f(value));
        }
        Some(Outcome::Failure(failure)) => {
            settler.reject(failure);
        }
        None => settler.cancel(),
    });
    next.depends_on(tail);
    next
}

/// Build a dependent task that runs the task `f` produces from `tail`'s success
/// value on its child scheduler and mirrors that task's outcome.
pub(crate) fn flat_map_continuation<V, U, F>(
    tail: &Task<V>,
    inner_lane: Option<Lane>,
    f: F,
) -> Task<U>
where
    V: Clone + Send + 'static,
    U: Clone + Send + 'static,
    F: FnOnce(V) -> Task<U> + Send + 'static,
{
    let source = tail.clone();
    let next = Task::new(move |settler: Settler<U>| match source.output() {
        Some(Outcome::Success(value)) => {
            let inner = f(value);
            // Runs at once if this step was cancelled while `f` was running.
            settler.on_cancel({
                let inner = inner.clone();
                move || inner.cancel()
            });
            settler.forward(&inner);
            settler.scheduler().submit(&inner, inner_lane);
        }
        Some(Outcome::Failure(failure)) => {
            settler.reject(failure);
        }
        None => settler.cancel(),
    });
    next.depends_on(tail);
    next
}

pub(crate) struct TaskCore<V> {
    id: TaskId,
    slot: Mutex<Slot<V>>,
}

struct Slot<V> {
    state: TaskState,
    output: Option<Outcome<V>>,
    work: Option<Work<V>>,
    on_cancel: Option<Callback>,
    watchers: Vec<Callback>,
    dependencies: Vec<Arc<dyn Schedulable>>,
    child: Option<Scheduler>,
    owner: Option<Scheduler>,
}

impl<V: Clone + Send + 'static> TaskCore<V> {
    fn output(&self) -> Option<Outcome<V>> {
        self.slot.lock().output.clone()
    }

    fn child(&self) -> Scheduler {
        self.slot
            .lock()
            .child
            .get_or_insert_with(|| Scheduler::new(SchedulerConfig::default()))
            .clone()
    }

    fn settle(&self, outcome: Outcome<V>) -> bool {
        let (watchers, owner) = {
            let mut slot = self.slot.lock();
            if slot.state != TaskState::Executing {
                return false;
            }
            #[cfg(feature = "tracing")]
            trace!(
                task_id = self.id.0,
                success = outcome.is_success(),
                "task finished"
            );
            slot.output = Some(outcome);
            slot.state = TaskState::Finished;
            slot.on_cancel = None;
            (mem::take(&mut slot.watchers), slot.owner.take())
        };
        run_all(watchers);
        drop(owner);
        true
    }

    fn execute(self: &Arc<Self>, work: Work<V>) {
        let settler = Settler {
            core: Arc::clone(self),
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| work(settler))) {
            let panic_message = panic_message(payload);

            #[cfg(feature = "tracing")]
            error!(
                task_id = self.id.0,
                panic_message = %panic_message,
                "task panicked during execution"
            );

            self.settle(Outcome::Failure(
                TaskError::Panicked {
                    task_id: self.id,
                    panic_message,
                }
                .into(),
            ));
        }
    }
}

impl<V: Clone + Send + 'static> Schedulable for TaskCore<V> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn state(&self) -> TaskState {
        self.slot.lock().state
    }

    fn dependencies(&self) -> Vec<Arc<dyn Schedulable>> {
        self.slot.lock().dependencies.clone()
    }

    fn adopt(&self, parent: &Scheduler) {
        let mut slot = self.slot.lock();
        if slot.child.is_none() {
            slot.child = Some(parent.child());
        }
    }

    fn start(self: Arc<Self>, owner: Option<Scheduler>) -> bool {
        // Dependencies are inspected without holding our own lock.
        let dependencies = self.dependencies();
        if dependencies.iter().any(|dep| !dep.state().is_settled()) {
            return false;
        }

        let (work, child) = {
            let mut slot = self.slot.lock();
            if slot.state != TaskState::Ready {
                return false;
            }
            slot.state = TaskState::Executing;
            slot.owner = owner;
            slot.dependencies.clear();
            let child = slot
                .child
                .get_or_insert_with(|| Scheduler::new(SchedulerConfig::default()))
                .clone();
            (slot.work.take(), child)
        };

        #[cfg(feature = "tracing")]
        trace!(task_id = self.id.0, "task executing");

        child.resume();
        if let Some(work) = work {
            self.execute(work);
        }
        true
    }

    fn cancel(&self) {
        let child = {
            let slot = self.slot.lock();
            if slot.state.is_settled() {
                return;
            }
            slot.child.clone()
        };
        if let Some(child) = child {
            child.cancel_all();
        }

        let (hook, watchers, owner) = {
            let mut slot = self.slot.lock();
            let was_executing = match slot.state {
                TaskState::Ready => false,
                TaskState::Executing => true,
                // Settled while the child was being cancelled.
                TaskState::Finished | TaskState::Cancelled => return,
            };
            slot.state = TaskState::Cancelled;
            slot.work = None;
            slot.dependencies.clear();
            let hook = slot.on_cancel.take().filter(|_| was_executing);
            (hook, mem::take(&mut slot.watchers), slot.owner.take())
        };

        #[cfg(feature = "tracing")]
        trace!(
            task_id = self.id.0,
            hook = hook.is_some(),
            "task cancelled"
        );

        if let Some(hook) = hook {
            hook();
        }
        run_all(watchers);
        drop(owner);
    }

    fn fail_to_launch(&self, failure: Failure) {
        {
            let mut slot = self.slot.lock();
            if slot.state != TaskState::Ready {
                return;
            }
            slot.state = TaskState::Executing;
            slot.work = None;
            slot.dependencies.clear();
        }
        self.settle(Outcome::Failure(failure));
    }

    fn on_settled(&self, callback: Callback) {
        let mut slot = self.slot.lock();
        if slot.state.is_settled() {
            drop(slot);
            callback();
        } else {
            slot.watchers.push(callback);
        }
    }
}

fn run_all(callbacks: Vec<Callback>) {
    for callback in callbacks {
        callback();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
