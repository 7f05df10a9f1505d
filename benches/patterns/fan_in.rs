//! Fan-out from one producer, fan-in into one combiner

use criterion::{BenchmarkId, Criterion};
use taskchain::{block, map_value, Combine, Queue, TaskResult};

fn square(n: u64) -> TaskResult<u64> {
    Ok(n * n)
}

pub fn bench_fan_in(c: &mut Criterion) {
    let queue = Queue::new();
    let mut group = c.benchmark_group("fan_out_fan_in");

    for width in [10usize, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            b.iter(|| {
                let source = block::value(3u64);
                let combined = Combine::new();
                for _ in 0..width {
                    source
                        .passes_result(&map_value(square))
                        .appends_result_to(&combined);
                }
                combined.submit(&queue);
                queue.wait_until_all_finished();
                assert_eq!(combined.output().map(|v| v.len()), Ok(width));
            });
        });
    }

    group.finish();
}
