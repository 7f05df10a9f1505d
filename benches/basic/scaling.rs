//! Scaling benchmarks - how execution time grows with task count

use criterion::{BenchmarkId, Criterion};
use taskchain::{block, Combine, Queue};

pub fn bench_scaling(c: &mut Criterion) {
    let queue = Queue::new();
    let mut group = c.benchmark_group("scaling");
    group.measurement_time(std::time::Duration::from_secs(8));

    for size in [10u64, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let combined = Combine::new();
                for i in 0..size {
                    block::value(i).appends_result_to(&combined);
                }
                combined.submit(&queue);
                queue.wait_until_all_finished();
            });
        });
    }

    group.finish();
}
