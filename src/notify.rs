//! Completion notifications for pipelines.
//!
//! A [`Pool`] runs pipelines on behalf of an application and turns each
//! pipeline's terminal success value into an optional notification for a
//! [`NotificationSink`]. Failed or cancelled pipelines never notify.

use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::outcome::Outcome;
use crate::pipeline::Pipeline;

/// Receives notifications produced from finished pipelines.
///
/// `notify` is called from whichever lane finished the pipeline.
pub trait NotificationSink: Send + Sync + 'static {
    type Notification: Send + 'static;

    fn notify(&self, notification: Self::Notification);
}

/// Runs pipelines and forwards their success values to a sink.
///
/// # Examples
///
/// ```
/// use std::sync::mpsc;
/// use std::sync::Mutex;
/// use tasklane::{Lane, NotificationSink, Pipeline, Pool};
///
/// struct Channel(Mutex<mpsc::Sender<String>>);
///
/// impl NotificationSink for Channel {
///     type Notification = String;
///
///     fn notify(&self, notification: String) {
///         let _ = self.0.lock().unwrap().send(notification);
///     }
/// }
///
/// let (tx, rx) = mpsc::channel();
/// let pool = Pool::new(Channel(Mutex::new(tx)));
///
/// pool.run(Pipeline::new(Lane::Utility, || "alice"), |user| {
///     Some(format!("{user} logged in"))
/// });
///
/// assert_eq!(rx.recv().unwrap(), "alice logged in");
/// ```
pub struct Pool<S> {
    sink: Arc<S>,
}

impl<S> Clone for Pool<S> {
    fn clone(&self) -> Self {
        Pool {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: NotificationSink> Pool<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Register `project` on `pipeline`'s terminal value, then start it.
    ///
    /// Returns the pipeline so the caller can still cancel it.
    pub fn run<V, F>(&self, pipeline: Pipeline<V>, project: F) -> Pipeline<V>
    where
        V: Clone + Send + 'static,
        F: FnOnce(&V) -> Option<S::Notification> + Send + 'static,
    {
        self.observe(&pipeline, project);
        pipeline.start();
        pipeline
    }

    /// Register `project` on `pipeline`'s terminal value without starting it.
    pub fn observe<V, F>(&self, pipeline: &Pipeline<V>, project: F)
    where
        V: Clone + Send + 'static,
        F: FnOnce(&V) -> Option<S::Notification> + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        pipeline.tail().on_settled(move |output| {
            if let Some(Outcome::Success(value)) = output {
                if let Some(notification) = project(&value) {
                    #[cfg(feature = "tracing")]
                    trace!("delivering pipeline notification");
                    sink.notify(notification);
                }
            }
        });
    }
}
