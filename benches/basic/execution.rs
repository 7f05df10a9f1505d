//! Basic execution benchmarks

use criterion::Criterion;
use taskchain::{block, map_value, Queue, Spawner, TaskResult};

fn run_independent(queue: &Queue, count: u64) {
    let tasks: Vec<_> = (0..count).map(block::value).collect();
    queue.add_tasks(&tasks);
    queue.wait_until_all_finished();
}

fn increment(n: u64) -> TaskResult<u64> {
    Ok(n + 1)
}

pub fn bench_execution(c: &mut Criterion) {
    let queue = Queue::new();

    c.bench_function("execute_10_independent_tasks", |b| {
        b.iter(|| run_independent(&queue, 10));
    });

    c.bench_function("execute_100_independent_tasks", |b| {
        b.iter(|| run_independent(&queue, 100));
    });

    c.bench_function("execute_map_chain_20", |b| {
        b.iter(|| {
            let mut last = block::value(0u64).passes_result(&map_value(increment));
            for _ in 1..20 {
                last = last.passes_result(&map_value(increment));
            }
            last.submit(&queue);
            queue.wait_until_all_finished();
            assert_eq!(last.output(), Ok(20));
        });
    });

    let inline = Queue::builder().name("bench.inline").spawner(Spawner::inline()).build();
    c.bench_function("execute_100_inline", |b| {
        b.iter(|| run_independent(&inline, 100));
    });
}
