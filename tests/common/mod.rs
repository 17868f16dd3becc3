// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use tasklane::{Settler, Task};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Await `fut`, failing the test instead of hanging.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("timed out waiting for the pipeline")
}

/// A task that hands its settler to the test instead of settling.
///
/// The receiver resolves once the task is executing.
pub fn deferred<V: Clone + Send + 'static>() -> (Task<V>, oneshot::Receiver<Settler<V>>) {
    let (tx, rx) = oneshot::channel();
    let task = Task::new(move |settler| {
        let _ = tx.send(settler);
    });
    (task, rx)
}

/// Shared call counter.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("lookup failed for {0}")]
pub struct LookupError(pub String);
