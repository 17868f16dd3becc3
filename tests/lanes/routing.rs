//! Tests for routing tasks to concurrent lanes

use futures::executor::block_on;
use test_case::test_case;

use tasklane::{Lane, Outcome, Pipeline, Scheduler, SchedulerConfig, Task};

fn current_thread() -> String {
    std::thread::current()
        .name()
        .unwrap_or_default()
        .to_string()
}

#[test_case(Lane::Background, "background" ; "background")]
#[test_case(Lane::Utility, "utility" ; "utility")]
#[test_case(Lane::Default, "default" ; "default lane")]
#[test_case(Lane::UserInitiated, "user-initiated" ; "user initiated")]
#[test_case(Lane::UserInteractive, "user-interactive" ; "user interactive")]
fn test_task_runs_on_requested_lane(lane: Lane, expected: &str) {
    let pipeline = Pipeline::new(lane, current_thread);
    pipeline.start();

    let name = block_on(pipeline.settled())
        .and_then(|o| o.into_result().ok())
        .unwrap();
    assert!(name.starts_with(&format!("tasklane-{expected}-")), "{name}");
}

#[test]
fn test_thread_name_prefix_from_config() {
    let config = SchedulerConfig::default().with_thread_name("fetch");
    let pipeline = Pipeline::with_config(config, Lane::Utility, current_thread);
    pipeline.start();

    let name = block_on(pipeline.settled())
        .and_then(|o| o.into_result().ok())
        .unwrap();
    assert!(name.starts_with("fetch-utility-"), "{name}");
}

#[test]
fn test_submit_uses_default_lane() {
    let scheduler = Scheduler::new(SchedulerConfig::default().with_default_lane(Lane::Background));
    let task = Task::new(|settler| {
        settler.fulfill(current_thread());
    });
    scheduler.submit(&task, None);
    scheduler.resume();

    let name = block_on(task.settled())
        .and_then(|o| o.into_result().ok())
        .unwrap();
    assert!(name.contains("-background-"), "{name}");
}

#[test]
fn test_concurrent_lane_runs_tasks_in_parallel() {
    let (tx, rx) = std::sync::mpsc::channel();
    let scheduler = Scheduler::new(SchedulerConfig::default().with_workers(2));
    let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));

    let tasks: Vec<Task<()>> = (0..2)
        .map(|_| {
            let barrier = barrier.clone();
            let tx = tx.clone();
            Task::new(move |settler| {
                barrier.wait();
                let _ = tx.send(());
                settler.fulfill(());
            })
        })
        .collect();
    for task in &tasks {
        scheduler.submit(task, Some(Lane::Default));
    }
    scheduler.resume();

    for _ in 0..2 {
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
    }
    for task in &tasks {
        assert_eq!(block_on(task.settled()), Some(Outcome::Success(())));
    }
}
