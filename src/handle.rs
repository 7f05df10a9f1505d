//! Typed handles over tasks.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::task::{Task, Work};

/// A [`Task`] together with typed access to its work.
///
/// Dereferences to [`Task`], so every lifecycle and graph operation is available
/// directly. Typed operations such as result wiring are defined on handles whose work
/// produces or consumes values (see [`crate::Produces`] and [`crate::Consumes`]).
///
/// Cloning is cheap and yields another handle to the same task.
pub struct TaskHandle<W> {
    task: Task,
    work: Arc<W>,
}

impl<W: Work> TaskHandle<W> {
    pub fn new(work: W) -> Self {
        let work = Arc::new(work);
        let task = Task::from_work(Arc::clone(&work) as Arc<dyn Work>);
        Self { task, work }
    }

    /// Create a handle and name its task.
    pub fn named(name: impl Into<String>, work: W) -> Self {
        let handle = Self::new(work);
        handle.task.set_name(name);
        handle
    }
}

impl<W> TaskHandle<W> {
    /// Set the task's name and return the handle, for construction chains.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.task.set_name(name);
        self
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }

    pub(crate) fn work_arc(&self) -> Arc<W> {
        Arc::clone(&self.work)
    }

    pub(crate) fn work_weak(&self) -> Weak<W> {
        Arc::downgrade(&self.work)
    }
}

impl<W> Deref for TaskHandle<W> {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

impl<W> AsRef<Task> for TaskHandle<W> {
    fn as_ref(&self) -> &Task {
        &self.task
    }
}

impl<W> Clone for TaskHandle<W> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            work: Arc::clone(&self.work),
        }
    }
}

impl<W> From<TaskHandle<W>> for Task {
    fn from(handle: TaskHandle<W>) -> Task {
        handle.task
    }
}

impl<W> fmt::Debug for TaskHandle<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.task, f)
    }
}

impl<W> fmt::Display for TaskHandle<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.task, f)
    }
}
