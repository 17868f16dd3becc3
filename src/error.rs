//! Error types raised by the engine itself.
//!
//! Application failures travel as opaque [`Failure`](crate::Failure) values. The
//! variants here are the reasons the engine rejects a task on its own; they are
//! delivered the same way, wrapped in a `Failure`.

use crate::types::{Lane, TaskId};

/// Failures the scheduler or lanes report for a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task's function panicked while executing.
    #[error(
        "Task {task_id} panicked during execution: {panic_message}\n\
         \n\
         Tasks should reject instead of panicking. The task was settled as a failure."
    )]
    Panicked {
        task_id: TaskId,
        panic_message: String,
    },

    /// The task was routed to the main lane but none was configured.
    #[error("task routed to the main lane, but no MainLane was injected into its scheduler")]
    MainLaneUnavailable,

    /// The injected main lane no longer accepts work.
    #[error("the main lane has been shut down")]
    MainLaneShutDown,

    /// Worker threads for a concurrent lane could not be created.
    #[error("failed to start workers for the {lane} lane: {message}")]
    LaneSpawn { lane: Lane, message: String },
}

/// Invalid [`SchedulerConfig`](crate::SchedulerConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("a scheduler needs at least one worker per lane")]
    ZeroWorkers,

    #[error("worker thread name prefix must not be empty")]
    EmptyThreadName,
}
