//! Tests for extremely deep dependency chains

use taskchain::{
    block, map_value, retrying, BlockTask, Combine, Queue, RetryStrategy, Spawner, Task,
    TaskResult,
};

use crate::common::{drain, failure, queue};

fn increment(n: i64) -> TaskResult<i64> {
    Ok(n + 1)
}

#[test]
fn test_deep_chain_on_inline_spawner() {
    let first = block::run(|| {}).into_task();
    let mut last = first.clone();
    for _ in 0..20_000 {
        last = last.then(&block::run(|| {}).into_task());
    }

    let queue = Queue::builder()
        .name("inline")
        .spawner(Spawner::inline())
        .build();
    last.submit(&queue);

    assert!(first.is_finished());
    assert!(last.is_finished());
    assert!(queue.is_idle());
}

#[test]
fn test_deep_result_chain() {
    let mut last = block::value(0i64).passes_result(&map_value(increment));
    for _ in 1..10_000 {
        last = last.passes_result(&map_value(increment));
    }

    let queue = queue();
    last.submit(&queue);
    drain(&queue);

    assert_eq!(last.output(), Ok(10_000));
}

#[test]
fn test_multiple_parallel_deep_chains() {
    // 8 chains of depth 500, joined at the end
    let join = Combine::new();
    for chain_id in 0..8i64 {
        let mut current = block::value(chain_id * 1000).passes_result(&map_value(increment));
        for _ in 1..500 {
            current = current.passes_result(&map_value(increment));
        }
        current.appends_result_to(&join);
    }
    let total = join.passes_result(&map_value(|values: Vec<i64>| Ok(values.iter().sum::<i64>())));

    let queue = queue();
    total.submit(&queue);
    drain(&queue);

    // Each chain: start + 500, so 500 * 8 + (0 + 1000 + ... + 7000)
    assert_eq!(total.output(), Ok(32_000));
}

#[test]
fn test_long_retry_run_in_queue() {
    let flaky = retrying(
        BlockTask::new(|| -> TaskResult<()> { Err(failure("again")) }),
        RetryStrategy::repeat(30_000),
    );
    let after: Task = block::run(|| {}).into_task();
    flaky.then(&after);

    let queue = queue();
    after.submit(&queue);
    drain(&queue);

    assert_eq!(flaky.work().failure_count(), 30_001);
    assert!(after.is_finished());
}
