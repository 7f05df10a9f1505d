//! Chain resolution and dependency ordering under a real pool

use taskchain::{block, Task, TaskHandle};
use test_case::test_case;

use crate::common::{drain, init_tracing, queue, Recorder};
use taskchain_test::Record;

#[test]
fn test_single_task_chain() {
    let task = block::value(1);
    assert_eq!(task.chain(), vec![task.task().clone()]);
}

#[test]
fn test_linear_chain_is_idempotent() {
    let recorder = Recorder::new();
    let a = recorder.task("a");
    let b = recorder.task("b");
    let c = recorder.task("c");
    a.then(&b).then(&c);

    let expected: Vec<Task> = vec![a.task().clone(), b.task().clone(), c.task().clone()];
    for _ in 0..10 {
        assert_eq!(c.chain(), expected);
    }
}

#[test_case(1 ; "one layer")]
#[test_case(4 ; "four layers")]
#[test_case(16 ; "sixteen layers")]
fn test_layered_graph_runs_in_dependency_order(layers: usize) {
    init_tracing();
    let recorder = Recorder::new();
    let width = 4;

    let mut previous: Vec<TaskHandle<Record>> = Vec::new();
    let mut all = Vec::new();
    for layer in 0..layers {
        let current: Vec<_> = (0..width)
            .map(|i| recorder.task(&format!("{layer}.{i}")))
            .collect();
        for task in &current {
            for dep in &previous {
                task.add_dependency(dep);
            }
        }
        all.extend(current.iter().cloned());
        previous = current;
    }
    let sink = recorder.task("sink");
    for dep in &previous {
        sink.add_dependency(dep);
    }

    let queue = queue();
    sink.submit(&queue);
    drain(&queue);

    assert!(all.iter().all(|t| t.is_finished()));
    for task in all.iter().chain(std::iter::once(&sink)) {
        let name = task.name().unwrap_or_default();
        let at = recorder.position(&name).expect("task ran");
        for dep in task.dependencies() {
            let dep_name = dep.name().unwrap_or_default();
            assert!(recorder.position(&dep_name).expect("dependency ran") < at);
        }
    }
}

#[test]
fn test_submitting_several_tails_shares_common_chain() {
    let recorder = Recorder::new();
    let root = recorder.task("root");
    let left = recorder.task("left");
    let right = recorder.task("right");
    root.then(&left);
    root.then(&right);

    let queue = queue();
    left.submit(&queue);
    right.submit(&queue);
    drain(&queue);

    let entries = recorder.entries();
    assert_eq!(entries.iter().filter(|e| *e == "root").count(), 1);
    assert_eq!(entries.len(), 3);
}
