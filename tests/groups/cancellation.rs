//! Cancelling a group while its chain is in flight

use taskchain::{Queue, TaskError};

use crate::common::{drain, threaded_queue, wait_until, Gate, Recorder, TIMEOUT};

#[test]
fn test_cancel_group_with_member_in_flight() {
    let recorder = Recorder::new();
    let op1 = recorder.task("op1");
    let op2 = Gate::closed();
    op1.then(&op2);
    let group = op2.group(false);

    let queue = threaded_queue();
    group.submit(&queue);
    assert!(wait_until(TIMEOUT, || op2.is_executing()));

    group.cancel();
    drain(&queue);

    assert!(group.is_finished());
    assert!(group.is_cancelled());
    assert!(op1.is_finished());
    assert!(!op1.is_cancelled());
    assert!(op2.is_finished());
    assert!(op2.is_cancelled());
    assert_eq!(group.output(), Err(TaskError::NoResult));
}

#[test]
fn test_cancel_before_start_skips_chain() {
    let recorder = Recorder::new();
    let group = recorder.task("never").group(false);
    group.cancel();

    let queue = Queue::new();
    group.submit(&queue);
    drain(&queue);

    assert!(group.is_finished());
    assert!(recorder.entries().is_empty());
}

#[test]
fn test_cancel_outer_group_reaches_inner_members() {
    let gate = Gate::closed();
    let inner = gate.group(false);
    let outer = inner.group(false);

    let queue = threaded_queue();
    outer.submit(&queue);
    assert!(wait_until(TIMEOUT, || gate.is_executing()));

    outer.cancel();
    drain(&queue);

    assert!(gate.is_cancelled());
    assert!(inner.is_cancelled());
    assert!(outer.is_finished());
}
