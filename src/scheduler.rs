//! Scheduler: tracks submitted tasks, gates them on their dependencies and on
//! the suspended flag, and routes ready tasks to lanes.
//!
//! Dependencies are honored across lanes and across schedulers: a task is only
//! handed to its lane once every dependency has settled, wherever that
//! dependency runs. A task whose dependency was cancelled is cancelled instead
//! of being run.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, error, trace};

use crate::config::SchedulerConfig;
use crate::error::TaskError;
use crate::lane::WorkerPools;
use crate::node::Schedulable;
use crate::task::Task;
use crate::types::{Lane, TaskId, TaskState};

/// Owns a set of tasks and runs them on lanes in dependency order.
///
/// A new scheduler is suspended: submitted tasks wait until [`Scheduler::resume`].
/// Clones share the same scheduler.
///
/// # Examples
///
/// ```
/// use tasklane::{Lane, Outcome, Scheduler, SchedulerConfig, Task};
///
/// let scheduler = Scheduler::new(SchedulerConfig::default());
///
/// let fetch = Task::new(|settler| {
///     settler.fulfill(20);
/// });
/// let double = Task::new({
///     let fetch = fetch.clone();
///     move |settler| {
///         let value = fetch.output().and_then(|o| o.into_result().ok()).unwrap_or(0);
///         settler.fulfill(value * 2);
///     }
/// });
/// double.depends_on(&fetch);
///
/// scheduler.submit(&double, Some(Lane::Utility));
/// scheduler.submit(&fetch, None);
/// scheduler.resume();
///
/// let output = futures::executor::block_on(double.settled());
/// assert_eq!(output, Some(Outcome::Success(40)));
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    queue: Mutex<Queue>,
    /// Shared with every child scheduler created through [`Scheduler::child`].
    pools: Arc<WorkerPools>,
}

struct Queue {
    suspended: bool,
    tracked: Vec<Entry>,
    /// Eligible tasks held back while suspended, in the order they became
    /// eligible.
    parked: VecDeque<Entry>,
}

#[derive(Clone)]
struct Entry {
    task: Arc<dyn Schedulable>,
    lane: Lane,
}

impl Scheduler {
    /// Create a suspended scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        let pools = Arc::new(WorkerPools::new(config.clone()));
        Self::with_pools(config, pools)
    }

    /// A suspended scheduler with this one's configuration, running its
    /// concurrent lanes on the same worker pools.
    pub(crate) fn child(&self) -> Scheduler {
        Self::with_pools(self.inner.config.clone(), Arc::clone(&self.inner.pools))
    }

    fn with_pools(config: SchedulerConfig, pools: Arc<WorkerPools>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                queue: Mutex::new(Queue {
                    suspended: true,
                    tracked: Vec::new(),
                    parked: VecDeque::new(),
                }),
                pools,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn default_lane(&self) -> Lane {
        self.inner.config.default_lane
    }

    /// Track `task` and run it on `lane` (or the default lane) once its
    /// dependencies have settled and the scheduler is not suspended.
    pub fn submit<V: Clone + Send + 'static>(&self, task: &Task<V>, lane: Option<Lane>) {
        let task: Arc<dyn Schedulable> = task.core.clone();
        self.submit_erased(task, lane);
    }

    fn submit_erased(&self, task: Arc<dyn Schedulable>, lane: Option<Lane>) {
        let lane = lane.unwrap_or(self.inner.config.default_lane);
        task.adopt(self);
        let dependencies = task.dependencies();

        #[cfg(feature = "tracing")]
        debug!(
            task_id = task.id().0,
            lane = %lane,
            dependency_count = dependencies.len(),
            "submitting task"
        );

        let entry = Entry { task, lane };
        self.inner.queue.lock().tracked.push(entry.clone());

        // One extra count so the entry cannot become eligible before every
        // watcher is registered.
        let remaining = Arc::new(AtomicUsize::new(dependencies.len() + 1));
        for dependency in dependencies {
            let scheduler = Arc::downgrade(&self.inner);
            let remaining = Arc::clone(&remaining);
            let entry = entry.clone();
            dependency.on_settled(Box::new(move || {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    if let Some(scheduler) = upgrade(&scheduler) {
                        scheduler.dependencies_settled(entry);
                    }
                }
            }));
        }
        if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.dependencies_settled(entry);
        }
    }

    /// Allow lanes to start tasks.
    ///
    /// Tasks held back while suspended are dispatched in the order they became
    /// eligible. Tasks already executing are unaffected.
    pub fn resume(&self) {
        let parked = {
            let mut queue = self.inner.queue.lock();
            if !queue.suspended {
                return;
            }
            queue.suspended = false;
            mem::take(&mut queue.parked)
        };

        #[cfg(feature = "tracing")]
        debug!(parked = parked.len(), "scheduler resumed");

        for entry in parked {
            self.dispatch(entry);
        }
    }

    /// Stop lanes from starting further tasks. Tasks already executing are
    /// unaffected.
    pub fn suspend(&self) {
        self.inner.queue.lock().suspended = true;
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.queue.lock().suspended
    }

    /// Cancel every tracked task and forget them.
    ///
    /// Finished tasks keep their outcome; executing tasks have their
    /// cancellation hook invoked.
    pub fn cancel_all(&self) {
        let tracked = {
            let mut queue = self.inner.queue.lock();
            queue.parked.clear();
            mem::take(&mut queue.tracked)
        };

        #[cfg(feature = "tracing")]
        debug!(tracked = tracked.len(), "cancelling all tasks");

        for entry in tracked {
            entry.task.cancel();
        }
    }

    /// Number of tracked tasks, settled or not.
    pub fn tracked_count(&self) -> usize {
        self.inner.queue.lock().tracked.len()
    }

    /// Ids of tracked tasks that have not settled yet, in submission order.
    pub fn pending(&self) -> Vec<TaskId> {
        let tracked: Vec<Entry> = self.inner.queue.lock().tracked.clone();
        tracked
            .iter()
            .filter(|entry| !entry.task.state().is_settled())
            .map(|entry| entry.task.id())
            .collect()
    }

    fn dependencies_settled(&self, entry: Entry) {
        if entry.task.state().is_settled() {
            return;
        }
        let cancelled_dependency = entry
            .task
            .dependencies()
            .iter()
            .any(|dependency| dependency.state() == TaskState::Cancelled);
        if cancelled_dependency {
            #[cfg(feature = "tracing")]
            trace!(
                task_id = entry.task.id().0,
                "dependency cancelled, cancelling dependent"
            );
            entry.task.cancel();
            return;
        }

        {
            let mut queue = self.inner.queue.lock();
            if queue.suspended {
                queue.parked.push_back(entry);
                return;
            }
        }
        self.dispatch(entry);
    }

    fn dispatch(&self, entry: Entry) {
        let task = Arc::clone(&entry.task);
        let lane = entry.lane;

        #[cfg(feature = "tracing")]
        trace!(task_id = task.id().0, lane = %lane, "dispatching task");

        let scheduler = self.clone();
        let job = Box::new(move || scheduler.launch(entry));

        let result = if lane.is_main() {
            match &self.inner.config.main_lane {
                Some(main) => main.send(job),
                None => Err(TaskError::MainLaneUnavailable),
            }
        } else {
            self.inner.pools.execute(lane, job)
        };

        if let Err(err) = result {
            #[cfg(feature = "tracing")]
            error!(task_id = task.id().0, lane = %lane, %err, "lane refused task");
            task.fail_to_launch(err.into());
        }
    }

    /// Runs on the lane.
    fn launch(&self, entry: Entry) {
        {
            let mut queue = self.inner.queue.lock();
            if queue.suspended {
                queue.parked.push_back(entry);
                return;
            }
        }
        entry.task.start(Some(self.clone()));
    }
}

fn upgrade(inner: &Weak<SchedulerInner>) -> Option<Scheduler> {
    inner.upgrade().map(|inner| Scheduler { inner })
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.inner.queue.lock();
        f.debug_struct("Scheduler")
            .field("default_lane", &self.inner.config.default_lane)
            .field("suspended", &queue.suspended)
            .field("tracked", &queue.tracked.len())
            .finish()
    }
}
