//! Error types for task results and graph construction.
//!
//! Failures never cross task boundaries as panics or early returns. A task records its
//! failure in its output slot as the `Err` case of a [`TaskResult`], and the next stage
//! observes it only when it is its turn to run.

use std::sync::Arc;

use thiserror::Error;

use crate::types::TaskId;

/// The outcome carried between tasks.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors carried by [`TaskResult`]s.
///
/// `TaskError` is cheap to clone so that one producer's failure can be handed to any
/// number of consumers. User-defined failures are shared behind an `Arc`, and equality
/// on [`TaskError::Failed`] is identity of that shared error: a failure passed through
/// unchanged compares equal to where it came from.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// A result was read before it was ever set.
    ///
    /// This is the initial value of every input and output slot. Seeing it downstream
    /// means a wiring bug or a cancelled upstream producer.
    #[error("no result has been produced")]
    NoResult,

    /// A transform overrode neither of its mapping strategies.
    #[error("`{0}` is not implemented")]
    NotImplemented(&'static str),

    /// One or more inputs of a combine step failed. Carries every failure, in input order.
    #[error("{} of the combined results failed", .0.len())]
    Aggregate(Vec<TaskError>),

    /// A failure produced by task logic. Opaque to this crate.
    #[error("{0}")]
    Failed(Arc<anyhow::Error>),
}

impl TaskError {
    /// Wrap any error as a user-defined failure.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        TaskError::Failed(Arc::new(err.into()))
    }

    /// Build a user-defined failure from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        TaskError::Failed(Arc::new(anyhow::Error::msg(message)))
    }

    /// Returns `true` for [`TaskError::NoResult`].
    pub fn is_no_result(&self) -> bool {
        matches!(self, TaskError::NoResult)
    }

    /// The user-defined error, if this is a [`TaskError::Failed`].
    pub fn as_failed(&self) -> Option<&anyhow::Error> {
        match self {
            TaskError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for TaskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TaskError::NoResult, TaskError::NoResult) => true,
            (TaskError::NotImplemented(a), TaskError::NotImplemented(b)) => a == b,
            (TaskError::Aggregate(a), TaskError::Aggregate(b)) => a == b,
            (TaskError::Failed(a), TaskError::Failed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::Failed(Arc::new(err))
    }
}

/// Run a fallible computation and capture its outcome as a [`TaskResult`].
///
/// ```
/// use taskchain::outcome;
///
/// let parsed = outcome(|| Ok("42".parse::<i32>()?));
/// assert_eq!(parsed.unwrap(), 42);
///
/// let broken = outcome(|| Ok("x".parse::<i32>()?));
/// assert!(broken.is_err());
/// ```
pub fn outcome<T>(f: impl FnOnce() -> anyhow::Result<T>) -> TaskResult<T> {
    f().map_err(TaskError::from)
}

/// Errors detected while inspecting a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// Following dependency edges from a task led back to a task already on the path.
    #[error("dependency cycle detected at task {task_id} ({})", .name.as_deref().unwrap_or("unnamed"))]
    Cycle { task_id: TaskId, name: Option<String> },
}
