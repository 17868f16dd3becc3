//! Core type definitions shared by tasks, schedulers and pipelines.
//!
//! This module defines task identifiers, the task and pipeline lifecycle states,
//! and the [`Lane`] priority classes tasks are routed to.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque task identifier.
///
/// Identifiers are process-unique and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single [`Task`](crate::Task).
///
/// ```text
/// Ready ──▶ Executing ──▶ Finished
///   │           │
///   └───────────┴──▶ Cancelled
/// ```
///
/// `Finished` and `Cancelled` are absorbing: once entered, no further
/// transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting to be dequeued by a lane.
    Ready,
    /// The task's function has been invoked and has not settled yet.
    Executing,
    /// The task settled with an [`Outcome`](crate::Outcome).
    Finished,
    /// The task was cancelled before it finished. It never has an outcome.
    Cancelled,
}

impl TaskState {
    /// True for `Finished` and `Cancelled`.
    pub fn is_settled(self) -> bool {
        matches!(self, TaskState::Finished | TaskState::Cancelled)
    }
}

/// Lifecycle of a [`Pipeline`](crate::Pipeline) chain.
///
/// Moves forward only: `Ready → Started → Cancelled` or `Ready → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Ready,
    Started,
    Cancelled,
}

/// Execution context a task runs in.
///
/// `Main` is a single serial lane shared by every scheduler it is injected into
/// (see [`MainLane`](crate::MainLane)). All other variants are concurrent worker
/// lanes owned by a [`Scheduler`](crate::Scheduler); the priority only sizes the
/// worker pool and never changes ordering guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    Main,
    Background,
    Utility,
    Default,
    UserInitiated,
    UserInteractive,
}

impl Lane {
    /// Every concurrent (non-main) lane, lowest priority first.
    pub const CONCURRENT: [Lane; 5] = [
        Lane::Background,
        Lane::Utility,
        Lane::Default,
        Lane::UserInitiated,
        Lane::UserInteractive,
    ];

    pub fn is_main(self) -> bool {
        self == Lane::Main
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Lane::Main => "main",
            Lane::Background => "background",
            Lane::Utility => "utility",
            Lane::Default => "default",
            Lane::UserInitiated => "user-initiated",
            Lane::UserInteractive => "user-interactive",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
