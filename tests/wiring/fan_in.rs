//! Many producers, one combining consumer

use std::time::Duration;

use taskchain::{block, passes_results, Combine, TaskError, TaskResult};

use crate::common::{drain, failure, sleep_then, threaded_queue};

#[test]
fn test_concurrent_appends_are_all_kept() {
    let producers: Vec<_> = (0..32u32)
        .map(|i| sleep_then(Duration::from_millis(u64::from(i % 4)), i))
        .collect();
    let combined = passes_results(&producers, &Combine::new());

    let queue = threaded_queue();
    combined.submit(&queue);
    drain(&queue);

    let mut values = combined.output().expect("all producers succeeded");
    values.sort_unstable();
    assert_eq!(values, (0..32).collect::<Vec<_>>());
}

#[test]
fn test_failure_is_contagious() {
    let error = failure("middle");
    let expected = error.clone();
    let combined = Combine::new();
    block::value(1).appends_result_to(&combined);
    block::from_fn(move || -> TaskResult<i32> { Err(error.clone()) }).appends_result_to(&combined);
    block::value(3).appends_result_to(&combined);

    let queue = threaded_queue();
    combined.submit(&queue);
    drain(&queue);

    assert_eq!(combined.output(), Err(TaskError::Aggregate(vec![expected])));
}

#[test]
fn test_combine_result_feeds_downstream() {
    let combined = Combine::with_inputs(vec![Ok(1), Ok(2)]);
    let total = combined.passes_result(&taskchain::map_value(|v: Vec<i32>| Ok(v.iter().sum::<i32>())));

    let queue = threaded_queue();
    total.submit(&queue);
    drain(&queue);

    assert_eq!(total.output(), Ok(3));
}
