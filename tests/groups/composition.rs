//! Group composition and failure passthrough

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskchain::{block, map_value, Group, TaskResult};

use crate::common::{drain, failure, queue, Recorder};

#[test]
fn test_group_failure_passthrough_skips_downstream_body() {
    let error = failure("A failed");
    let expected = error.clone();
    let side_effects = Arc::new(AtomicUsize::new(0));
    let counter = side_effects.clone();

    let a = block::from_fn(move || -> TaskResult<i32> { Err(error.clone()) });
    let b = a.passes_result(&map_value(move |n: i32| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(n)
    }));
    let group = Group::wrap(&b, false);

    let queue = queue();
    group.submit(&queue);
    drain(&queue);

    assert_eq!(group.output(), Err(expected));
    assert_eq!(side_effects.load(Ordering::SeqCst), 0);
}

#[test]
fn test_groups_wired_in_sequence() {
    let recorder = Recorder::new();
    let first = recorder.task("first.a").group(false);
    let second_tail = recorder.task("second.b");
    recorder.task("second.a").then(&second_tail);
    let second = first.passes_result(&second_tail.group(false));

    let queue = queue();
    second.submit(&queue);
    drain(&queue);

    assert_eq!(
        recorder.entries(),
        vec!["first.a", "second.a", "second.b"]
    );
    assert_eq!(second.output(), Ok(()));
}

#[test]
fn test_failure_skips_every_later_group() {
    let recorder = Recorder::new();
    let failing = block::from_fn(|| -> TaskResult<()> { Err(failure("stop")) }).group(false);
    let middle = failing.passes_result(&recorder.task("middle").group(false));
    let last = middle.passes_result(&recorder.task("last").group(false));

    let queue = queue();
    last.submit(&queue);
    drain(&queue);

    assert!(recorder.entries().is_empty());
    assert_eq!(last.output(), failing.output());
    assert!(last.output().is_err());
}

#[test]
fn test_nested_groups() {
    let recorder = Recorder::new();
    let inner = recorder.task("leaf").group(false);
    let outer = inner.group(false);

    let queue = queue();
    outer.submit(&queue);
    drain(&queue);

    assert_eq!(recorder.entries(), vec!["leaf"]);
    assert!(inner.is_finished() && outer.is_finished());
    assert_eq!(outer.output(), Ok(()));
}
