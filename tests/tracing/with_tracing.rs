//! Tests with tracing feature enabled

use taskchain::{block, map_value, retrying, BlockTask, RetryStrategy, TaskResult};
use tracing_subscriber::{fmt, EnvFilter};

use crate::common::{drain, failure, queue};

#[test]
fn test_tracing_with_subscriber() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let last = block::value(2).passes_result(&map_value(|n: i32| Ok(n * 3)));
    let group = last.group(true);

    let queue = queue();
    group.submit(&queue);
    drain(&queue);

    assert_eq!(last.output(), Ok(6));
}

#[test]
fn test_tracing_with_retries_and_panics() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("taskchain=trace"))
        .with_test_writer()
        .try_init();

    let flaky = retrying(
        BlockTask::new(|| -> TaskResult<()> { Err(failure("logged")) }),
        RetryStrategy::repeat(2),
    );
    let panicking = block::run(|| panic!("logged panic"));
    flaky.then(&panicking);

    let queue = queue();
    panicking.submit(&queue);
    drain(&queue);

    assert!(flaky.output().is_err());
    assert!(panicking.is_finished());
}
