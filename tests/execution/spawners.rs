//! Every spawner runs the same graph

use taskchain::{block, map_value, Combine, Queue, Spawner};
use test_case::test_case;

use crate::common::drain;

fn pool() -> Spawner {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(3)
        .build()
        .expect("build rayon pool");
    Spawner::pool(pool)
}

#[test_case(Spawner::rayon() ; "rayon global pool")]
#[test_case(pool() ; "dedicated rayon pool")]
#[test_case(Spawner::thread() ; "thread per task")]
#[test_case(Spawner::inline() ; "inline")]
#[test_case(Spawner::new(|job| { std::thread::spawn(job); }) ; "custom closure")]
fn test_diamond_on_spawner(spawner: Spawner) {
    let source = block::value(4);
    let left = source.passes_result(&map_value(|n: i32| Ok(n + 1)));
    let right = source.passes_result(&map_value(|n: i32| Ok(n * 2)));
    let joined = Combine::new();
    left.appends_result_to(&joined);
    right.appends_result_to(&joined);
    let total = joined.passes_result(&map_value(|v: Vec<i32>| Ok(v.iter().sum::<i32>())));

    let queue = Queue::builder().spawner(spawner).build();
    total.submit(&queue);
    drain(&queue);

    assert_eq!(total.output(), Ok(13));
}
