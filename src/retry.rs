//! Retrying tasks.
//!
//! [`Retrying`] decorates any producing work. Each time the task is about to finish with a
//! failed output, the retry policy is asked whether to run the body again. Retries happen
//! in place: the task stays `Executing` and no new task is created, so dependents and
//! wiring see a single finish with the last attempt's result.
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use taskchain::{retrying, BlockTask, Queue, RetryStrategy, TaskError};
//!
//! let attempts = AtomicU32::new(0);
//! let body = BlockTask::new(move || {
//!     if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
//!         Err(TaskError::msg("not yet"))
//!     } else {
//!         Ok("done")
//!     }
//! });
//! let flaky = retrying(body, RetryStrategy::repeat(5));
//!
//! let queue = Queue::new();
//! flaky.submit(&queue);
//! queue.wait_until_all_finished();
//! assert_eq!(flaky.output(), Ok("done"));
//! assert_eq!(flaky.work().failure_count(), 2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::TaskError;
use crate::handle::TaskHandle;
use crate::result::{Consumes, Produces, Slot};
use crate::task::{Finish, Task, Work};

/// Decides whether to retry after a failure, given the number of failures so far
/// (starting at 1) and the latest error.
pub type RetryPolicy = Arc<dyn Fn(u32, &TaskError) -> bool + Send + Sync>;

/// Built-in retry policies.
pub struct RetryStrategy;

impl RetryStrategy {
    /// Never retry.
    pub fn none() -> RetryPolicy {
        Arc::new(|_, _| false)
    }

    /// Retry while the failure count is at most `times`, so the body runs at most
    /// `times + 1` times.
    pub fn repeat(times: u32) -> RetryPolicy {
        Arc::new(move |failures, _| failures <= times)
    }

    /// Any closure as a policy. Waiting between attempts, if wanted, is up to the closure.
    pub fn custom(policy: impl Fn(u32, &TaskError) -> bool + Send + Sync + 'static) -> RetryPolicy {
        Arc::new(policy)
    }
}

/// Producing work that is re-run while its output is a failure and the policy agrees.
pub struct Retrying<W> {
    inner: W,
    policy: RwLock<RetryPolicy>,
    failures: AtomicU32,
}

impl<W: Produces> Retrying<W> {
    pub fn new(inner: W, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy: RwLock::new(policy),
            failures: AtomicU32::new(0),
        }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// Failed attempts so far.
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Replace the policy. Takes effect at the next failure.
    pub fn set_policy(&self, policy: RetryPolicy) {
        *self.policy.write() = policy;
    }
}

impl<W: Produces> Work for Retrying<W> {
    fn execute(&self, task: &Task) {
        self.inner.execute(task);
    }

    fn before_finish(&self, task: &Task) -> Finish {
        if self.inner.before_finish(task) == Finish::Retry {
            return Finish::Retry;
        }
        if task.is_cancelled() {
            return Finish::Commit;
        }

        let Some(err) = self.inner.output().error() else {
            return Finish::Commit;
        };

        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        let policy = Arc::clone(&*self.policy.read());
        if policy(failures, &err) {
            #[cfg(feature = "tracing")]
            debug!(task_id = task.id().0, failures, error = %err, "retrying task");

            Finish::Retry
        } else {
            #[cfg(feature = "tracing")]
            debug!(task_id = task.id().0, failures, error = %err, "giving up on task");

            Finish::Commit
        }
    }
}

impl<W: Produces> Produces for Retrying<W> {
    type Output = W::Output;

    fn output(&self) -> &Slot<W::Output> {
        self.inner.output()
    }
}

impl<W: Produces + Consumes> Consumes for Retrying<W> {
    type Input = W::Input;

    fn input(&self) -> &Slot<W::Input> {
        self.inner.input()
    }
}

impl<W: fmt::Debug> fmt::Debug for Retrying<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("inner", &self.inner)
            .field("failures", &self.failures.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// A task running `work` under `policy`.
pub fn retrying<W: Produces>(work: W, policy: RetryPolicy) -> TaskHandle<Retrying<W>> {
    TaskHandle::new(Retrying::new(work, policy))
}
