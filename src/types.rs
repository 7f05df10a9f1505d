//! Core type definitions for task identity and lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, process-unique task identifier.
///
/// Identity is what graph membership, deduplication and equality of [`crate::Task`]s
/// are based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a task.
///
/// `Ready → Executing → Finished`. `Finished` is terminal. A cancelled task goes from
/// `Ready` straight to `Finished` without running its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    #[default]
    Ready,
    Executing,
    Finished,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Ready => "ready",
            State::Executing => "executing",
            State::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Notifications delivered to state observers (see [`crate::Task::observe_state`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// The state is about to change.
    WillChange { from: State, to: State },
    /// The state has changed.
    DidChange { from: State, to: State },
    /// The task was cancelled.
    Cancelled,
    /// A dependency was added or removed.
    DependenciesChanged,
    /// The task finished and every finish hook has run. Fired exactly once.
    Completed,
}
