//! Tests for value continuations

use crate::common::{within, Counter, LookupError};
use tasklane::{Failure, Lane, Outcome, Pipeline, Task};

#[tokio::test]
async fn test_long_chain_preserves_order() {
    let mut pipeline = Pipeline::new(Lane::Default, Vec::<u32>::new);
    for i in 0..20 {
        pipeline = pipeline.then(move |mut seen| {
            seen.push(i);
            seen
        });
    }
    pipeline.start();

    let output = within(pipeline.settled()).await;
    assert_eq!(output, Some(Outcome::Success((0..20).collect())));
}

#[tokio::test]
async fn test_value_types_change_along_the_chain() {
    let pipeline = Pipeline::new(Lane::Default, || "21")
        .then(|s| s.parse::<i32>().unwrap_or_default())
        .then(|n| n * 2)
        .then(|n| format!("{n}"));
    pipeline.start();

    assert_eq!(
        within(pipeline.settled()).await,
        Some(Outcome::Success("42".to_string()))
    );
}

#[tokio::test]
async fn test_failure_short_circuits_to_the_end() {
    let calls = Counter::default();
    let failure = Failure::new(LookupError("alice".into()));
    let head = Pipeline::from_task(Lane::Default, {
        let failure = failure.clone();
        Task::<String>::new(move |settler| {
            settler.reject(failure);
        })
    });
    let pipeline = head
        .then({
            let calls = calls.clone();
            move |name| {
                calls.hit();
                name.len()
            }
        })
        .then({
            let calls = calls.clone();
            move |len| {
                calls.hit();
                len > 3
            }
        });
    pipeline.start();

    let output = within(pipeline.settled()).await;
    let forwarded = output.and_then(|o| o.failure().cloned()).unwrap();
    assert_eq!(forwarded, failure);
    assert_eq!(
        forwarded.downcast_ref::<LookupError>(),
        Some(&LookupError("alice".into()))
    );
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn test_then_on_changes_lane_per_step() {
    let pipeline = Pipeline::new(Lane::Background, thread_name)
        .then_on(Lane::UserInteractive, |first| (first, thread_name()));
    pipeline.start();

    let (first, second) = within(pipeline.settled())
        .await
        .and_then(|o| o.into_result().ok())
        .unwrap();
    assert!(first.contains("-background-"), "{first}");
    assert!(second.contains("-user-interactive-"), "{second}");
}

#[tokio::test]
async fn test_task_then_outside_pipeline() {
    let task = Task::from_value(4);
    let next = task.then(|v| v * v);

    task.start();

    assert_eq!(within(next.settled()).await, Some(Outcome::Success(16)));
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or_default()
        .to_string()
}
