//! Pipelines: chains of tasks sharing one scheduler.
//!
//! Every combinator appends a task that depends on the chain's current tail and
//! returns a new [`Pipeline`] handle over the *same* scheduler and lifecycle. The
//! chain is one execution unit: [`Pipeline::start`] and [`Pipeline::cancel`]
//! act on every step, whichever handle they are called through.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::{flat_map_continuation, map_continuation, Settler, Task};
use crate::types::{Lane, PipelineState};

/// A chain of tasks with a single start/cancel lifecycle.
///
/// # Examples
///
/// ```
/// use tasklane::{Lane, Outcome, Pipeline, PipelineState};
///
/// let pipeline = Pipeline::new(Lane::Utility, || 42).then(|v| v + 1);
/// pipeline.start();
///
/// let output = futures::executor::block_on(pipeline.settled());
/// assert_eq!(output, Some(Outcome::Success(43)));
/// assert_eq!(pipeline.state(), PipelineState::Started);
/// ```
pub struct Pipeline<V> {
    scheduler: Scheduler,
    state: Arc<Mutex<PipelineState>>,
    tail: Task<V>,
}

impl<V> Clone for Pipeline<V> {
    fn clone(&self) -> Self {
        Pipeline {
            scheduler: self.scheduler.clone(),
            state: Arc::clone(&self.state),
            tail: self.tail.clone(),
        }
    }
}

impl<V> std::fmt::Debug for Pipeline<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &*self.state.lock())
            .field("tail", &self.tail)
            .finish()
    }
}

impl<V: Clone + Send + 'static> Pipeline<V> {
    /// Create a pipeline whose first step runs `work` on `lane`.
    ///
    /// `lane` also becomes the chain's default lane. Nothing runs until
    /// [`Pipeline::start`].
    pub fn new<F>(lane: Lane, work: F) -> Self
    where
        F: FnOnce() -> V + Send + 'static,
    {
        Self::with_config(SchedulerConfig::default().with_default_lane(lane), lane, work)
    }

    /// Like [`Pipeline::new`], with an explicit scheduler configuration.
    pub fn with_config<F>(config: SchedulerConfig, lane: Lane, work: F) -> Self
    where
        F: FnOnce() -> V + Send + 'static,
    {
        let task = Task::new(move |settler: Settler<V>| {
            settler.fulfill(work());
        });
        Self::from_task_with_config(config, lane, task)
    }

    /// Create a pipeline whose first step is `task`.
    pub fn from_task(lane: Lane, task: Task<V>) -> Self {
        Self::from_task_with_config(SchedulerConfig::default().with_default_lane(lane), lane, task)
    }

    pub fn from_task_with_config(config: SchedulerConfig, lane: Lane, task: Task<V>) -> Self {
        let scheduler = Scheduler::new(config);
        scheduler.submit(&task, Some(lane));
        Pipeline {
            scheduler,
            state: Arc::new(Mutex::new(PipelineState::Ready)),
            tail: task,
        }
    }

    /// Start every step of the chain.
    ///
    /// Only a `Ready` pipeline starts; calling this again, or after
    /// [`Pipeline::cancel`], does nothing.
    pub fn start(&self) {
        {
            let mut state = self.state.lock();
            if *state != PipelineState::Ready {
                return;
            }
            *state = PipelineState::Started;
        }

        #[cfg(feature = "tracing")]
        debug!(tail_id = self.tail.id().0, "pipeline started");

        self.scheduler.resume();
    }

    /// Cancel every step of the chain that has not finished.
    pub fn cancel(&self) {
        *self.state.lock() = PipelineState::Cancelled;

        #[cfg(feature = "tracing")]
        debug!(tail_id = self.tail.id().0, "pipeline cancelled");

        self.scheduler.cancel_all();
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// The last step of the chain.
    pub fn tail(&self) -> &Task<V> {
        &self.tail
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The chain's terminal outcome, once its last step has finished.
    pub fn output(&self) -> Option<Outcome<V>> {
        self.tail.output()
    }

    /// Wait for the last step to settle. Resolves to `None` if it is cancelled.
    pub fn settled(&self) -> impl Future<Output = Option<Outcome<V>>> + Send + 'static {
        self.tail.settled()
    }

    /// Append a step computing `f` from this step's value, on the chain's
    /// default lane.
    ///
    /// A failure is forwarded without calling `f`.
    pub fn then<U, F>(&self, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> U + Send + 'static,
    {
        self.chain(map_continuation(&self.tail, f), None)
    }

    /// Like [`Pipeline::then`], running `f` on `lane`.
    pub fn then_on<U, F>(&self, lane: Lane, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> U + Send + 'static,
    {
        self.chain(map_continuation(&self.tail, f), Some(lane))
    }

    /// Append a step that obtains a task from `f` and settles with that task's
    /// outcome.
    ///
    /// The produced task runs on the step's own child scheduler, on the chain's
    /// default lane.
    pub fn then_task<U, F>(&self, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> Task<U> + Send + 'static,
    {
        self.then_task_in(None, f)
    }

    /// Like [`Pipeline::then_task`], running the produced task on `lane`.
    pub fn then_task_on<U, F>(&self, lane: Lane, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> Task<U> + Send + 'static,
    {
        self.then_task_in(Some(lane), f)
    }

    /// Append a step that builds a whole sub-pipeline from this step's value,
    /// starts it, and settles with its terminal outcome.
    ///
    /// Cancelling this chain cancels the sub-pipeline.
    pub fn then_pipeline<U, F>(&self, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> Pipeline<U> + Send + 'static,
    {
        let source = self.tail.clone();
        let next = Task::new(move |settler: Settler<U>| match source.output() {
            Some(Outcome::Success(value)) => {
                let inner = f(value);
                let nested = inner.clone();
                settler.on_cancel(move || nested.cancel());
                settler.forward(&inner.tail);
                inner.start();
            }
            Some(Outcome::Failure(failure)) => {
                settler.reject(failure);
            }
            None => settler.cancel(),
        });
        next.depends_on(&self.tail);
        self.chain(next, Some(self.wrapper_lane()))
    }

    fn then_task_in<U, F>(&self, inner_lane: Option<Lane>, f: F) -> Pipeline<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(V) -> Task<U> + Send + 'static,
    {
        let next = flat_map_continuation(&self.tail, inner_lane, f);
        self.chain(next, Some(self.wrapper_lane()))
    }

    /// Lane for steps that only hand off nested work. Never the main lane.
    fn wrapper_lane(&self) -> Lane {
        match self.scheduler.default_lane() {
            Lane::Main => Lane::Default,
            lane => lane,
        }
    }

    fn chain<U: Clone + Send + 'static>(&self, task: Task<U>, lane: Option<Lane>) -> Pipeline<U> {
        self.scheduler.submit(&task, lane);
        Pipeline {
            scheduler: self.scheduler.clone(),
            state: Arc::clone(&self.state),
            tail: task,
        }
    }
}
