//! Task helpers for internal use in taskchain tests and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

#![cfg(not(tarpaulin_include))]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use taskchain::{Produces, Slot, Task, TaskError, TaskHandle, TaskResult, Work};
use thiserror::Error;

/// A user-defined failure for tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("test failure: {0}")]
pub struct TestError(pub String);

/// A [`TaskError::Failed`] wrapping a [`TestError`].
pub fn failure(message: &str) -> TaskError {
    TaskError::failed(TestError(message.to_string()))
}

/// Shared, ordered log of task names.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    /// A named task that records its name when it runs and produces it.
    pub fn task(&self, name: &str) -> TaskHandle<Record> {
        TaskHandle::named(
            name,
            Record {
                name: name.to_string(),
                recorder: self.clone(),
                output: Slot::new(),
            },
        )
    }
}

pub struct Record {
    name: String,
    recorder: Recorder,
    output: Slot<String>,
}

impl Work for Record {
    fn execute(&self, task: &Task) {
        self.recorder.push(self.name.clone());
        self.output.set(Ok(self.name.clone()));
        task.finish();
    }
}

impl Produces for Record {
    type Output = String;

    fn output(&self) -> &Slot<String> {
        &self.output
    }
}

/// Produces `value` after sleeping on the worker thread.
pub struct Sleep<T> {
    duration: Duration,
    value: T,
    output: Slot<T>,
}

impl<T: Clone + Send + Sync + 'static> Work for Sleep<T> {
    fn execute(&self, task: &Task) {
        thread::sleep(self.duration);
        self.output.set(Ok(self.value.clone()));
        task.finish();
    }
}

impl<T: Clone + Send + Sync + 'static> Produces for Sleep<T> {
    type Output = T;

    fn output(&self) -> &Slot<T> {
        &self.output
    }
}

pub fn sleep_then<T: Clone + Send + Sync + 'static>(duration: Duration, value: T) -> TaskHandle<Sleep<T>> {
    TaskHandle::new(Sleep {
        duration,
        value,
        output: Slot::new(),
    })
}

/// Stays executing until opened or cancelled, finishing from a helper thread.
///
/// Produces `Ok(())` when opened and keeps `Err(NoResult)` when cancelled.
pub struct Gate {
    open: Arc<(Mutex<bool>, Condvar)>,
    output: Arc<Slot<()>>,
}

impl Gate {
    pub fn closed() -> TaskHandle<Gate> {
        TaskHandle::new(Gate {
            open: Arc::new((Mutex::new(false), Condvar::new())),
            output: Arc::new(Slot::new()),
        })
    }

    pub fn open(&self) {
        let (open, signal) = &*self.open;
        *open.lock() = true;
        signal.notify_all();
    }
}

impl Work for Gate {
    fn execute(&self, task: &Task) {
        let task = task.clone();
        let open = Arc::clone(&self.open);
        let output = Arc::clone(&self.output);
        thread::spawn(move || {
            let opened = {
                let (flag, signal) = &*open;
                let mut opened = flag.lock();
                while !*opened && !task.is_cancelled() {
                    signal.wait_for(&mut opened, Duration::from_millis(2));
                }
                *opened
            };
            if opened {
                output.set(Ok(()));
            }
            task.finish();
        });
    }
}

impl Produces for Gate {
    type Output = ();

    fn output(&self) -> &Slot<()> {
        &self.output
    }
}

/// Poll `condition` until it holds or `timeout` passes. Returns whether it held.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Unwrap a result in tests, with the error's display text on failure.
pub fn ok<T>(result: TaskResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("expected success, got: {err}"),
    }
}
