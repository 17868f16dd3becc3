//! Tests for pools delivering pipeline notifications

use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;

use crate::common::within;
use tasklane::{Failure, Lane, NotificationSink, Pipeline, Pool, Task};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Welcome(String),
    Count(usize),
}

struct Inbox(Mutex<mpsc::UnboundedSender<Event>>);

impl NotificationSink for Inbox {
    type Notification = Event;

    fn notify(&self, notification: Event) {
        let _ = self.0.lock().unbounded_send(notification);
    }
}

fn pool() -> (Pool<Inbox>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded();
    (Pool::new(Inbox(Mutex::new(tx))), rx)
}

#[tokio::test]
async fn test_pool_delivers_in_completion_order() {
    let (pool, mut rx) = pool();

    let first = pool.run(Pipeline::new(Lane::Default, || "ann".to_string()), |name| {
        Some(Event::Welcome(name.clone()))
    });
    within(first.settled()).await;
    pool.run(Pipeline::new(Lane::Utility, || vec![1, 2, 3]), |items| {
        Some(Event::Count(items.len()))
    });

    assert_eq!(within(rx.next()).await, Some(Event::Welcome("ann".into())));
    assert_eq!(within(rx.next()).await, Some(Event::Count(3)));
}

#[tokio::test]
async fn test_pool_skips_failures_and_cancellations() {
    let (pool, mut rx) = pool();

    let failed = pool.run(
        Pipeline::from_task(
            Lane::Default,
            Task::<String>::new(|settler| {
                settler.reject(Failure::msg("offline"));
            }),
        ),
        |name| Some(Event::Welcome(name.clone())),
    );
    within(failed.settled()).await;

    let cancelled = Pipeline::new(Lane::Default, || "never".to_string());
    pool.observe(&cancelled, |name| Some(Event::Welcome(name.clone())));
    cancelled.cancel();

    let marker = pool.run(Pipeline::new(Lane::Default, || 0usize), |n| Some(Event::Count(*n)));
    within(marker.settled()).await;

    assert_eq!(within(rx.next()).await, Some(Event::Count(0)));
}

#[tokio::test]
async fn test_observe_waits_for_start() {
    let (pool, mut rx) = pool();
    let pipeline = Pipeline::new(Lane::Default, || 4usize).then(|n| n * 2);
    pool.observe(&pipeline, |n| Some(Event::Count(*n)));

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(rx.try_next().is_err());

    pipeline.start();
    assert_eq!(within(rx.next()).await, Some(Event::Count(8)));
}
