//! Groups and retries: sub-chains run as a single task

use criterion::Criterion;
use std::sync::atomic::{AtomicU32, Ordering};
use taskchain::{block, map_value, retrying, BlockTask, Queue, RetryStrategy, TaskError, TaskResult};

fn increment(n: u32) -> TaskResult<u32> {
    Ok(n + 1)
}

pub fn bench_groups(c: &mut Criterion) {
    let queue = Queue::new();

    c.bench_function("group_of_chain_10", |b| {
        b.iter(|| {
            let mut last = block::value(0u32).passes_result(&map_value(increment));
            for _ in 1..10 {
                last = last.passes_result(&map_value(increment));
            }
            let group = last.group(true);
            group.submit(&queue);
            queue.wait_until_all_finished();
            assert_eq!(group.output(), Ok(()));
            assert_eq!(last.output(), Ok(10));
        });
    });

    c.bench_function("retry_until_third_attempt", |b| {
        b.iter(|| {
            let attempts = AtomicU32::new(0);
            let flaky = retrying(
                BlockTask::new(move || {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TaskError::msg("not yet"))
                    } else {
                        Ok(())
                    }
                }),
                RetryStrategy::repeat(5),
            );
            flaky.submit(&queue);
            queue.wait_until_all_finished();
        });
    });
}
