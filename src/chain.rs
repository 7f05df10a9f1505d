//! Dependency chain resolution and submission.
//!
//! A task's chain is every task it transitively depends on, followed by the task itself,
//! in an order where no task precedes one of its own dependencies. Submitting a task
//! submits its whole chain, so only the terminal task of a graph needs to be handed to a
//! queue.

use std::collections::HashSet;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::GraphError;
use crate::progress::{chain_progress, Progress};
use crate::queue::Queue;
use crate::task::Task;
use crate::types::TaskId;

impl Task {
    /// The deduplicated, dependency-ordered chain ending with this task.
    ///
    /// Terminates on cyclic graphs, though the order is then meaningless; use
    /// [`Task::try_chain`] to detect cycles.
    pub fn chain(&self) -> Vec<Task> {
        walk(self).0
    }

    /// Like [`Task::chain`], but fails if following dependencies leads back to a task that
    /// is still being expanded.
    ///
    /// ```
    /// use taskchain::{GraphError, Task, Work};
    ///
    /// struct Noop;
    /// impl Work for Noop {
    ///     fn execute(&self, task: &Task) { task.finish(); }
    /// }
    ///
    /// let a = Task::new(Noop);
    /// let b = Task::new(Noop);
    /// a.then(&b);
    /// assert_eq!(b.try_chain().unwrap(), vec![a.clone(), b.clone()]);
    ///
    /// b.then(&a);
    /// assert!(matches!(b.try_chain(), Err(GraphError::Cycle { .. })));
    /// ```
    pub fn try_chain(&self) -> Result<Vec<Task>, GraphError> {
        match walk(self) {
            (chain, None) => Ok(chain),
            (_, Some(err)) => Err(err),
        }
    }

    /// Make this task a dependency of `next` and return `next`, so linear pipelines read
    /// left to right: `a.then(&b).then(&c)`.
    pub fn then<N>(&self, next: &N) -> N
    where
        N: AsRef<Task> + Clone,
    {
        next.as_ref().add_dependency(self);
        next.clone()
    }

    /// Submit this task's whole chain to `queue` in one batch.
    pub fn submit(&self, queue: &Queue) -> &Self {
        let chain = self.chain();

        #[cfg(feature = "tracing")]
        debug!(
            task_id = self.id().0,
            chain_len = chain.len(),
            queue = queue.name(),
            "submitting chain"
        );

        queue.add_tasks(chain);
        self
    }

    /// Submit this task's chain and return progress aggregated over it.
    pub fn submit_with_progress(&self, queue: &Queue) -> Progress {
        let progress = chain_progress(self);
        self.submit(queue);
        progress
    }
}

/// Iterative post-order walk. Returns the chain and the first back edge found, if any.
fn walk(root: &Task) -> (Vec<Task>, Option<GraphError>) {
    let mut chain = Vec::new();
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut expanding: HashSet<TaskId> = HashSet::new();
    let mut cycle = None;

    // (task, expanded): an expanded entry is emitted when popped.
    let mut stack = vec![(root.clone(), false)];

    while let Some((task, expanded)) = stack.pop() {
        if expanded {
            expanding.remove(&task.id());
            chain.push(task);
            continue;
        }

        if !visited.insert(task.id()) {
            continue;
        }
        expanding.insert(task.id());

        let dependencies = task.dependencies();
        stack.push((task, true));

        for dependency in dependencies.into_iter().rev() {
            if expanding.contains(&dependency.id()) {
                if cycle.is_none() {
                    cycle = Some(GraphError::Cycle {
                        task_id: dependency.id(),
                        name: dependency.name(),
                    });
                }
                continue;
            }
            if !visited.contains(&dependency.id()) {
                stack.push((dependency, false));
            }
        }
    }

    (chain, cycle)
}
