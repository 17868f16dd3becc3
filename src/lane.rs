//! Lanes: the execution contexts that actually run ready tasks.
//!
//! - [`MainLane`]: one serial lane with an explicit start/shutdown lifecycle.
//!   It is created once and injected into every scheduler that routes work to
//!   [`Lane::Main`], so main-lane work from independent pipelines is strictly
//!   ordered.
//! - [`WorkerPools`]: the concurrent lanes of one scheduler, one thread pool per
//!   priority, created on first use.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use futures::channel::mpsc;
use futures::executor::{self, ThreadPool};
use futures::StreamExt;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, error};

use crate::config::SchedulerConfig;
use crate::error::TaskError;
use crate::types::Lane;

/// A unit of work handed to a lane.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Process-wide serial lane.
///
/// Jobs run one at a time, in the order they were handed to the lane, on a
/// dedicated thread. Clones share the same lane.
///
/// # Examples
///
/// ```
/// use tasklane::{Lane, MainLane, Pipeline, SchedulerConfig};
///
/// let main = MainLane::start().unwrap();
/// let config = SchedulerConfig::default().with_main_lane(main.clone());
///
/// let pipeline = Pipeline::with_config(config, Lane::Main, || "on main");
/// pipeline.start();
///
/// let output = futures::executor::block_on(pipeline.settled());
/// assert_eq!(output.and_then(|o| o.into_result().ok()), Some("on main"));
///
/// main.shutdown();
/// ```
#[derive(Clone)]
pub struct MainLane {
    inner: Arc<MainLaneInner>,
}

struct MainLaneInner {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl MainLane {
    /// Spawn the lane's thread.
    pub fn start() -> Result<Self, TaskError> {
        let (sender, mut receiver) = mpsc::unbounded::<Job>();

        let handle = thread::Builder::new()
            .name("tasklane-main".to_string())
            .spawn(move || {
                executor::block_on(async move {
                    while let Some(job) = receiver.next().await {
                        // Tasks catch their own panics; this keeps the lane alive
                        // for anything else.
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            #[cfg(feature = "tracing")]
                            error!("job panicked on the main lane");
                        }
                    }
                })
            })
            .map_err(|err| TaskError::LaneSpawn {
                lane: Lane::Main,
                message: err.to_string(),
            })?;

        #[cfg(feature = "tracing")]
        debug!("main lane started");

        Ok(Self {
            inner: Arc::new(MainLaneInner {
                sender: Mutex::new(Some(sender)),
                thread_id: handle.thread().id(),
                thread: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Queue `job` behind everything already handed to the lane.
    pub fn execute<F>(&self, job: F) -> Result<(), TaskError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Box::new(job))
    }

    pub(crate) fn send(&self, job: Job) -> Result<(), TaskError> {
        let sender = self.inner.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender
                .unbounded_send(job)
                .map_err(|_| TaskError::MainLaneShutDown),
            None => Err(TaskError::MainLaneShutDown),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.sender.lock().is_some()
    }

    /// True when called from the lane's own thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Stop accepting work, run what is already queued, and wait for the lane's
    /// thread to exit.
    ///
    /// When called from a job running on the lane itself, the lane stops
    /// accepting work but the call does not wait.
    pub fn shutdown(&self) {
        let sender = self.inner.sender.lock().take();
        drop(sender);

        if self.is_current() {
            return;
        }
        let handle = self.inner.thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }

        #[cfg(feature = "tracing")]
        debug!("main lane shut down");
    }
}

impl fmt::Debug for MainLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLane")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Concurrent lanes of a single scheduler.
pub(crate) struct WorkerPools {
    config: SchedulerConfig,
    pools: Mutex<HashMap<Lane, ThreadPool>>,
}

impl WorkerPools {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Run `job` on the pool for `lane`, creating the pool if needed.
    pub(crate) fn execute(&self, lane: Lane, job: Job) -> Result<(), TaskError> {
        let pool = self.pool(lane)?;
        pool.spawn_ok(async move { job() });
        Ok(())
    }

    fn pool(&self, lane: Lane) -> Result<ThreadPool, TaskError> {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(&lane) {
            return Ok(pool.clone());
        }

        let size = self.config.pool_size(lane);
        let pool = ThreadPool::builder()
            .pool_size(size)
            .name_prefix(format!("{}-{}-", self.config.thread_name, lane))
            .create()
            .map_err(|err| TaskError::LaneSpawn {
                lane,
                message: err.to_string(),
            })?;

        #[cfg(feature = "tracing")]
        debug!(lane = %lane, size, "worker pool created");

        pools.insert(lane, pool.clone());
        Ok(pool)
    }

    #[cfg(test)]
    pub(crate) fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }
}
