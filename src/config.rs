//! Scheduler configuration.

use std::num::NonZeroUsize;

use crate::error::ConfigError;
use crate::lane::MainLane;
use crate::types::Lane;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// Child schedulers created for nested tasks inherit their parent's
/// configuration, including the injected [`MainLane`].
///
/// # Examples
///
/// ```
/// use tasklane::{Lane, SchedulerConfig};
///
/// let config = SchedulerConfig::default()
///     .with_default_lane(Lane::Utility)
///     .with_workers(4)
///     .with_thread_name("fetcher");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.pool_size(Lane::Utility), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Lane used when a task is submitted without one.
    pub default_lane: Lane,
    /// Serial lane that tasks routed to [`Lane::Main`] run on.
    pub main_lane: Option<MainLane>,
    /// Upper bound on worker threads for each concurrent lane.
    pub workers: usize,
    /// Prefix for worker thread names.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_lane: Lane::Default,
            main_lane: None,
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            thread_name: "tasklane".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_default_lane(mut self, lane: Lane) -> Self {
        self.default_lane = lane;
        self
    }

    pub fn with_main_lane(mut self, main_lane: MainLane) -> Self {
        self.main_lane = Some(main_lane);
        self
    }

    /// Set the worker bound. Values below one are raised to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        Ok(())
    }

    /// Worker threads for `lane`.
    ///
    /// Priority only scales the pool: background work gets a single thread,
    /// utility work half the bound, everything else the full bound.
    pub fn pool_size(&self, lane: Lane) -> usize {
        let workers = self.workers.max(1);
        match lane {
            Lane::Main | Lane::Background => 1,
            Lane::Utility => (workers / 2).max(1),
            Lane::Default | Lane::UserInitiated | Lane::UserInteractive => workers,
        }
    }
}
