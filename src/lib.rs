//! Chainable Task Pipelines
//!
//! A small engine for composing one-shot units of work into chains that run on
//! prioritized execution lanes, with dependency gating, shared start/cancel
//! control and failure short-circuiting.
//!
//! # Features
//!
//! - **Settle-once tasks**: A [`Task`] runs a user function exactly once and settles
//!   with an [`Outcome`]: a value or a [`Failure`]. The function may settle right away or
//!   hand its [`Settler`] to another thread and settle later.
//! - **Dependency gating**: A task is only handed to its lane once every task it
//!   [depends on](Task::depends_on) has settled, wherever those dependencies run.
//! - **Lanes**: Work is routed to [`Lane::Main`], a single serial lane you start
//!   and inject ([`MainLane`]), or to one of five concurrent priority lanes backed by
//!   worker pools.
//! - **One lifecycle per chain**: Every [`Pipeline`] combinator returns a new handle over
//!   the same scheduler. Starting or cancelling through any handle affects the whole chain.
//! - **Short-circuiting**: A failure travels to the end of the chain without invoking
//!   the remaining value continuations.
//! - **Nested work**: [`Pipeline::then_task`] and [`Pipeline::then_pipeline`] flatten
//!   produced tasks and sub-pipelines into the chain; cancelling the chain reaches them.
//! - **Panic isolation**: A panicking task function settles its task with
//!   [`TaskError::Panicked`] instead of tearing down a lane.
//!
//! # Quick Start
//!
//! ```
//! use tasklane::{Lane, Outcome, Pipeline};
//!
//! let pipeline = Pipeline::new(Lane::Utility, || 42)
//!     .then(|v| v + 1)
//!     .then_on(Lane::Background, |v| format!("answer: {v}"));
//!
//! // Nothing runs until the chain is started.
//! pipeline.start();
//!
//! let output = futures::executor::block_on(pipeline.settled());
//! assert_eq!(output, Some(Outcome::Success("answer: 43".to_string())));
//! ```
//!
//! # Core Concepts
//!
//! ## Task
//!
//! A [`Task<V>`] moves through `Ready → Executing → Finished`, or to `Cancelled` from
//! either of the first two states. Once settled, its state and output never change.
//! [`Settler::on_cancel`] installs a hook that runs only if the task is cancelled while
//! executing.
//!
//! ```
//! use tasklane::{Failure, Outcome, Task};
//!
//! let task: Task<u32> = Task::new(|settler| {
//!     settler.reject(Failure::msg("disk full"));
//! });
//! task.start();
//!
//! match task.output() {
//!     Some(Outcome::Failure(failure)) => assert_eq!(failure.to_string(), "disk full"),
//!     other => panic!("unexpected output: {other:?}"),
//! }
//! ```
//!
//! ## Scheduler
//!
//! A [`Scheduler`] tracks submitted tasks and dispatches each one to its lane once its
//! dependencies have settled. Schedulers start suspended; [`Scheduler::resume`] lets
//! ready tasks go. Every task also owns a child scheduler ([`Settler::scheduler`]) for
//! nested work, cancelled together with the task.
//!
//! ## Pipeline
//!
//! A [`Pipeline<V>`] is the chain-building surface. Its state is `Ready` until
//! [`Pipeline::start`], then `Started`, or `Cancelled` after [`Pipeline::cancel`].
//!
//! ```
//! use tasklane::{Lane, Pipeline, PipelineState};
//!
//! let first = Pipeline::new(Lane::Default, || 1);
//! let last = first.then(|v| v * 2);
//!
//! last.cancel();
//! assert_eq!(first.state(), PipelineState::Cancelled);
//! assert!(first.tail().is_cancelled());
//! ```
//!
//! ## The main lane
//!
//! [`Lane::Main`] needs a [`MainLane`] injected through [`SchedulerConfig`]. Without one,
//! tasks routed there settle with [`TaskError::MainLaneUnavailable`]. Jobs on the main
//! lane run strictly one at a time in hand-off order, across every scheduler sharing it.
//!
//! ## Notifications
//!
//! A [`Pool`] runs pipelines and turns each successful terminal value into an optional
//! notification for a [`NotificationSink`].
//!
//! # Tracing
//!
//! Structured logging through the `tracing` crate is enabled by default. Disable
//! default features to compile it out entirely:
//!
//! ```toml
//! [dependencies]
//! tasklane = { version = "0.3", default-features = false }
//! ```
//!
//! - **DEBUG**: scheduler and pipeline lifecycle, lane creation
//! - **TRACE**: per-task dispatch, execution and settlement
//! - **ERROR**: task panics, lanes refusing work

mod config;
mod error;
mod lane;
mod node;
mod notify;
mod outcome;
mod pipeline;
mod scheduler;
mod task;
mod types;

// Public re-exports
pub use config::SchedulerConfig;
pub use error::{ConfigError, TaskError};
pub use lane::MainLane;
pub use notify::{NotificationSink, Pool};
pub use outcome::{Failure, Outcome};
pub use pipeline::Pipeline;
pub use scheduler::Scheduler;
pub use task::{Settler, Task};
pub use types::{Lane, PipelineState, TaskId, TaskState};
