//! Groups: a whole chain presented as one task.
//!
//! A [`Group`] wraps the tail of a chain. When the group runs it submits the tail's chain
//! to its own internal queue and finishes when the tail does, so the chain can be wired,
//! cancelled and measured as a single unit. Groups produce and consume `()`, which lets
//! one group be wired after another: a failure flowing into a group skips its chain and
//! flows straight out again.

use std::fmt;
use std::sync::Weak;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::{TaskError, TaskResult};
use crate::handle::TaskHandle;
use crate::progress::Progress;
use crate::result::{Consumes, Produces, Slot};
use crate::task::{Task, Work};

type Outcome = Box<dyn Fn(&Task) -> TaskResult<()> + Send + Sync>;

/// A task that runs another task's chain on an internal queue.
///
/// ```
/// use taskchain::{block, Queue};
///
/// let fetch = block::value(3);
/// let group = fetch.group(false);
///
/// let queue = Queue::new();
/// group.submit(&queue);
/// queue.wait_until_all_finished();
///
/// assert!(fetch.is_finished());
/// assert_eq!(group.output(), Ok(()));
/// ```
pub struct Group {
    tail: Task,
    outcome: Outcome,
    collate_progress: bool,
    input: Slot<()>,
    output: Slot<()>,
}

impl Group {
    /// Group the chain ending at a producing task. The group succeeds when the tail's
    /// output is a success and otherwise fails with the tail's error unchanged.
    pub fn wrap<P: Produces>(tail: &TaskHandle<P>, collate_progress: bool) -> TaskHandle<Group> {
        let producer = tail.work_arc();
        Self::build(
            tail.task().clone(),
            collate_progress,
            Box::new(move |_| producer.output().get().map(|_| ())),
        )
    }

    /// Group the chain ending at a plain task. The group succeeds unless the tail was
    /// cancelled.
    pub fn wrap_task(tail: &Task, collate_progress: bool) -> TaskHandle<Group> {
        Self::build(
            tail.clone(),
            collate_progress,
            Box::new(|tail| {
                if tail.is_cancelled() {
                    Err(TaskError::NoResult)
                } else {
                    Ok(())
                }
            }),
        )
    }

    fn build(tail: Task, collate_progress: bool, outcome: Outcome) -> TaskHandle<Group> {
        let handle = TaskHandle::new(Group {
            tail: tail.clone(),
            outcome,
            collate_progress,
            input: Slot::with(Ok(())),
            output: Slot::new(),
        });

        if collate_progress {
            let progress = Progress::weighted(tail.chain().iter());
            handle.set_estimated_work(progress.total_units());
            handle.set_progress(progress);
        }

        // The tail must not keep its group alive.
        let group_task = handle.downgrade();
        let group: Weak<Group> = handle.work_weak();
        tail.add_did_finish_hook(move |tail| {
            if let (Some(task), Some(group)) = (group_task.upgrade(), group.upgrade()) {
                // A tail finished by someone else before the group ran is picked up
                // in execute instead.
                if task.is_executing() {
                    group.complete(&task, tail);
                }
            }
        });

        handle
    }

    pub fn tail(&self) -> &Task {
        &self.tail
    }

    pub fn collates_progress(&self) -> bool {
        self.collate_progress
    }

    fn complete(&self, task: &Task, tail: &Task) {
        let result = (self.outcome)(tail);

        #[cfg(feature = "tracing")]
        debug!(
            task_id = task.id().0,
            tail_id = tail.id().0,
            ok = result.is_ok(),
            "group chain finished"
        );

        self.output.set(result);
        task.finish();
    }
}

impl Work for Group {
    fn execute(&self, task: &Task) {
        if let Err(err) = self.input.get() {
            #[cfg(feature = "tracing")]
            debug!(task_id = task.id().0, error = %err, "group input failed, skipping chain");

            self.output.set(Err(err));
            if self.collate_progress {
                task.progress().complete();
            }
            task.finish();
            return;
        }

        if self.tail.is_finished() {
            self.complete(task, &self.tail);
            return;
        }

        #[cfg(feature = "tracing")]
        debug!(task_id = task.id().0, "submitting group chain");

        // Cancellation only forwards to an internal queue that exists, so a cancel landing
        // before it was created must be applied to the chain here.
        let queue = task.internal_queue();
        if task.is_cancelled() {
            for member in self.tail.chain() {
                if !member.is_finished() {
                    member.cancel();
                }
            }
        }
        self.tail.submit(queue);
        if task.is_cancelled() {
            queue.cancel_all();
        }
    }
}

impl Produces for Group {
    type Output = ();

    fn output(&self) -> &Slot<()> {
        &self.output
    }
}

impl Consumes for Group {
    type Input = ();

    fn input(&self) -> &Slot<()> {
        &self.input
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("tail", &self.tail)
            .field("collate_progress", &self.collate_progress)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<P: Produces> TaskHandle<P> {
    /// Wrap this task's chain in a [`Group`].
    pub fn group(&self, collate_progress: bool) -> TaskHandle<Group> {
        Group::wrap(self, collate_progress)
    }
}

impl Task {
    /// Wrap this task's chain in a [`Group`]. See [`Group::wrap_task`].
    pub fn group_task(&self, collate_progress: bool) -> TaskHandle<Group> {
        Group::wrap_task(self, collate_progress)
    }
}
