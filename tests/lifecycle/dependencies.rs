//! Tests for dependency gating across tasks and schedulers

use crate::common::{deferred, within};
use tasklane::{Lane, Outcome, Scheduler, SchedulerConfig, Task, TaskState};

fn value_of(task: &Task<i32>) -> i32 {
    task.output()
        .and_then(|o| o.into_result().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_dependent_waits_for_dependency() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let (first, settler) = deferred::<i32>();
    let second = Task::new({
        let first = first.clone();
        move |settler| {
            settler.fulfill(value_of(&first) + 1);
        }
    });
    second.depends_on(&first);

    scheduler.submit(&second, None);
    scheduler.submit(&first, None);
    scheduler.resume();

    let settler = within(settler).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(second.state(), TaskState::Ready);

    settler.fulfill(10);
    assert_eq!(within(second.settled()).await, Some(Outcome::Success(11)));
}

#[tokio::test]
async fn test_fan_in_across_schedulers() {
    let left_scheduler = Scheduler::new(SchedulerConfig::default());
    let right_scheduler = Scheduler::new(SchedulerConfig::default());

    let left = Task::from_value(2);
    let right = Task::from_value(3);
    let sum = Task::new({
        let (left, right) = (left.clone(), right.clone());
        move |settler| {
            settler.fulfill(value_of(&left) + value_of(&right));
        }
    });
    sum.depends_on(&left);
    sum.depends_on(&right);

    left_scheduler.submit(&sum, Some(Lane::Utility));
    left_scheduler.submit(&left, None);
    right_scheduler.submit(&right, Some(Lane::Background));

    left_scheduler.resume();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(sum.state(), TaskState::Ready);

    right_scheduler.resume();
    assert_eq!(within(sum.settled()).await, Some(Outcome::Success(5)));
}

#[tokio::test]
async fn test_failed_dependency_still_releases_dependent() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let first: Task<i32> = Task::new(|settler| {
        settler.reject(tasklane::Failure::msg("nope"));
    });
    let second = Task::new({
        let first = first.clone();
        move |settler| {
            settler.fulfill(first.output().is_some_and(|o| o.is_failure()));
        }
    });
    second.depends_on(&first);

    scheduler.submit(&first, None);
    scheduler.submit(&second, None);
    scheduler.resume();

    assert_eq!(within(second.settled()).await, Some(Outcome::Success(true)));
}

#[tokio::test]
async fn test_cancelled_dependency_cancels_dependent() {
    let scheduler = Scheduler::new(SchedulerConfig::default());
    let first = Task::from_value(1);
    let second = Task::from_value(2);
    second.depends_on(&first);
    scheduler.submit(&second, None);

    first.cancel();

    assert_eq!(second.state(), TaskState::Cancelled);
}

#[tokio::test]
async fn test_standalone_start_checks_dependencies() {
    let first = Task::from_value(1);
    let second = Task::from_value(2);
    second.depends_on(&first);

    assert!(!second.start());
    assert!(first.start());
    assert!(second.start());
    assert_eq!(second.output(), Some(Outcome::Success(2)));
}
