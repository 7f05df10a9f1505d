// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use std::time::Duration;

use taskchain::{Queue, Spawner};

pub use taskchain_test::{failure, ok, sleep_then, wait_until, Gate, Recorder, TestError};

/// Generous upper bound for anything a test waits on.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A queue on rayon's global pool.
pub fn queue() -> Queue {
    Queue::builder().name("tests").build()
}

/// A queue that starts one thread per task, so blocking tasks never starve each other.
pub fn threaded_queue() -> Queue {
    Queue::builder()
        .name("tests.threaded")
        .spawner(Spawner::thread())
        .build()
}

/// Wait for the queue to drain, failing the test instead of hanging.
pub fn drain(queue: &Queue) {
    assert!(
        queue.wait_until_all_finished_timeout(TIMEOUT),
        "queue did not drain: {queue:?}"
    );
}

// Initialize tracing subscriber for tests (idempotent)
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing() {
    // No-op when tracing is disabled
}
