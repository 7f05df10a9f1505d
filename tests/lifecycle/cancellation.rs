//! Cancellation tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskchain::{block, map_value, State, TaskError};

use crate::common::{drain, queue, threaded_queue, wait_until, Gate, TIMEOUT};

#[test]
fn test_cancelled_producer_leaves_consumer_without_result() {
    for _ in 0..20 {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let producer = block::value(5);
        let consumer = producer.passes_result(&map_value(move |n: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(n)
        }));
        producer.cancel();

        let queue = queue();
        consumer.submit(&queue);
        drain(&queue);

        assert!(producer.is_finished());
        assert_eq!(producer.output(), Err(TaskError::NoResult));
        assert_eq!(consumer.input(), Err(TaskError::NoResult));
        assert_eq!(consumer.output(), Err(TaskError::NoResult));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_running_task_observes_cancellation() {
    let gate = Gate::closed();
    let queue = threaded_queue();
    gate.submit(&queue);

    assert!(wait_until(TIMEOUT, || gate.is_executing()));
    gate.cancel();
    drain(&queue);

    assert_eq!(gate.state(), State::Finished);
    assert!(gate.is_cancelled());
    assert_eq!(gate.output(), Err(TaskError::NoResult));
}

#[test]
fn test_cancel_all_leaves_finished_tasks_alone() {
    let done = block::value("done");
    let gate = Gate::closed();
    let after = block::value("after");
    done.then(&gate).then(&after);

    let queue = threaded_queue();
    after.submit(&queue);
    assert!(wait_until(TIMEOUT, || gate.is_executing()));

    queue.cancel_all();
    drain(&queue);

    assert!(!done.is_cancelled());
    assert_eq!(done.output(), Ok("done"));
    assert!(gate.is_cancelled());
    assert!(after.is_cancelled());
    assert_eq!(after.output(), Err(TaskError::NoResult));
}

#[test]
fn test_opened_gate_succeeds() {
    let gate = Gate::closed();
    let queue = threaded_queue();
    gate.submit(&queue);

    assert!(wait_until(TIMEOUT, || gate.is_executing()));
    gate.work().open();
    drain(&queue);

    assert_eq!(gate.output(), Ok(()));
    assert!(!gate.is_cancelled());
}
