//! Parallelism proof tests

use std::time::{Duration, Instant};

use taskchain::{Combine, Queue, Spawner};

use crate::common::{drain, sleep_then};

#[test]
fn test_independent_tasks_overlap() {
    let sleep = Duration::from_millis(50);
    let count = 20u32;
    let combined = Combine::new();
    for i in 0..count {
        sleep_then(sleep, i).appends_result_to(&combined);
    }

    let queue = Queue::builder().spawner(Spawner::thread()).build();
    let start = Instant::now();
    combined.submit(&queue);
    drain(&queue);
    let elapsed = start.elapsed();

    assert_eq!(combined.output().map(|v| v.len()), Ok(count as usize));

    // Sequential execution would take count * 50ms = 1s
    assert!(
        elapsed < sleep * count / 2,
        "tasks appear to run sequentially: {elapsed:?}"
    );
}

#[test]
fn test_max_concurrent_one_serialises() {
    let sleep = Duration::from_millis(10);
    let combined = Combine::new();
    for i in 0..5u32 {
        sleep_then(sleep, i).appends_result_to(&combined);
    }

    let queue = Queue::builder()
        .spawner(Spawner::thread())
        .max_concurrent(1)
        .build();
    let start = Instant::now();
    combined.submit(&queue);
    drain(&queue);

    assert!(start.elapsed() >= sleep * 5);
    assert!(combined.output().is_ok());
}
