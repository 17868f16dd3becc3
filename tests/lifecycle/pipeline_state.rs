//! Tests for the pipeline start/cancel lifecycle

use crate::common::{within, Counter};
use tasklane::{Lane, Outcome, Pipeline, PipelineState};

#[tokio::test]
async fn test_nothing_runs_before_start() {
    let calls = Counter::default();
    let pipeline = Pipeline::new(Lane::Default, {
        let calls = calls.clone();
        move || calls.hit()
    });

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    assert_eq!(calls.get(), 0);
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert_eq!(pipeline.scheduler().pending().len(), 1);
}

#[tokio::test]
async fn test_start_then_finish() {
    let pipeline = Pipeline::new(Lane::UserInitiated, || 42).then(|v| v + 1);
    pipeline.start();

    assert_eq!(within(pipeline.settled()).await, Some(Outcome::Success(43)));
    assert_eq!(pipeline.state(), PipelineState::Started);
    assert!(pipeline.scheduler().pending().is_empty());
}

#[tokio::test]
async fn test_start_through_any_handle() {
    let head = Pipeline::new(Lane::Default, || 2);
    let tail = head.then(|v| v * 3);

    head.start();

    assert_eq!(within(tail.settled()).await, Some(Outcome::Success(6)));
    assert_eq!(tail.state(), PipelineState::Started);
}

#[tokio::test]
async fn test_state_moves_forward_only() {
    let pipeline = Pipeline::new(Lane::Default, || ());

    pipeline.cancel();
    pipeline.start();

    assert_eq!(pipeline.state(), PipelineState::Cancelled);
}

#[tokio::test]
async fn test_dropped_pipeline_still_completes() {
    let (tx, rx) = futures::channel::oneshot::channel();
    {
        let pipeline = Pipeline::new(Lane::Utility, || 5).then(move |v| {
            let _ = tx.send(v);
            v
        });
        pipeline.start();
    }

    assert_eq!(within(rx).await.unwrap(), 5);
}
