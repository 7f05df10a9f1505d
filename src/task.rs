//! Task lifecycle state machine.
//!
//! A [`Task`] is a cheap, cloneable handle to one unit of work and its lifecycle:
//! `Ready → Executing → Finished`. The work itself is supplied by composition through the
//! [`Work`] trait; retrying, result passing and grouping are layered on as wrapper types
//! rather than subclasses.
//!
//! The state machine never infers completion. [`Work::execute`] may finish inline or hand
//! off to another thread, but the task stays `Executing` until [`Task::finish`] is called.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::events::{self, EventKind};
use crate::progress::Progress;
use crate::queue::Queue;
use crate::types::{State, StateEvent, TaskId};

/// The body of a task.
///
/// Implement `execute` to perform the work and call [`Task::finish`] when it is done,
/// either before returning or later from whatever thread completes the work.
///
/// ```
/// use taskchain::{Queue, Task, Work};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Count(Arc<AtomicUsize>);
///
/// impl Work for Count {
///     fn execute(&self, task: &Task) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         task.finish();
///     }
/// }
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let queue = Queue::new();
/// Task::new(Count(runs.clone())).submit(&queue);
/// queue.wait_until_all_finished();
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// ```
pub trait Work: Send + Sync + 'static {
    /// Perform the work. Must eventually lead to [`Task::finish`].
    fn execute(&self, task: &Task);

    /// Consulted each time [`Task::finish`] is called, before the finished state is
    /// committed. Returning [`Finish::Retry`] re-runs [`Work::execute`] in place instead.
    fn before_finish(&self, _task: &Task) -> Finish {
        Finish::Commit
    }
}

/// Decision returned by [`Work::before_finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Commit the finished state.
    Commit,
    /// Run the work again on the same task.
    Retry,
}

/// Whether the work body is on some thread's stack right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Idle,
    Running,
    /// A retry was requested while running; the running loop re-invokes the body.
    RerunRequested,
}

type Hook = Box<dyn FnOnce(&Task) + Send>;
type StateObserver = Arc<dyn Fn(&Task, StateEvent) + Send + Sync>;

#[derive(Default)]
struct Hooks {
    will_start: Vec<Hook>,
    did_start: Vec<Hook>,
    will_finish: Vec<Hook>,
    did_finish: Vec<Hook>,
}

struct Core {
    id: TaskId,
    name: RwLock<Option<String>>,
    state: RwLock<State>,
    cancelled: AtomicBool,
    started: AtomicBool,
    committed: AtomicBool,
    body: Mutex<Body>,
    dependencies: RwLock<Vec<Task>>,
    hooks: Mutex<Hooks>,
    observers: Mutex<Vec<StateObserver>>,
    progress: RwLock<Progress>,
    manages_own_progress: AtomicBool,
    estimated_work: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    finished_at: Mutex<Option<Instant>>,
    internal_queue: OnceLock<Queue>,
    work: Arc<dyn Work>,
}

/// A unit of work with a tracked lifecycle.
///
/// Equality and hashing are by identity ([`TaskId`]).
#[derive(Clone)]
pub struct Task {
    core: Arc<Core>,
}

/// A non-owning reference to a [`Task`].
#[derive(Clone)]
pub struct WeakTask {
    core: Weak<Core>,
}

impl WeakTask {
    pub fn upgrade(&self) -> Option<Task> {
        self.core.upgrade().map(|core| Task { core })
    }
}

impl Task {
    /// Create a task in the `Ready` state around `work`.
    pub fn new(work: impl Work) -> Self {
        Self::from_work(Arc::new(work))
    }

    pub(crate) fn from_work(work: Arc<dyn Work>) -> Self {
        Self {
            core: Arc::new(Core {
                id: TaskId::next(),
                name: RwLock::new(None),
                state: RwLock::new(State::Ready),
                cancelled: AtomicBool::new(false),
                started: AtomicBool::new(false),
                committed: AtomicBool::new(false),
                body: Mutex::new(Body::Idle),
                dependencies: RwLock::new(Vec::new()),
                hooks: Mutex::new(Hooks::default()),
                observers: Mutex::new(Vec::new()),
                progress: RwLock::new(Progress::new(1)),
                manages_own_progress: AtomicBool::new(false),
                estimated_work: AtomicU64::new(1),
                started_at: Mutex::new(None),
                finished_at: Mutex::new(None),
                internal_queue: OnceLock::new(),
                work,
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.core.id
    }

    pub fn name(&self) -> Option<String> {
        self.core.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.core.name.write() = Some(name.into());
    }

    pub fn downgrade(&self) -> WeakTask {
        WeakTask {
            core: Arc::downgrade(&self.core),
        }
    }

    // ---------------------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------------------

    pub fn state(&self) -> State {
        *self.core.state.read()
    }

    /// `true` while the task has not been started. Says nothing about dependencies; see
    /// [`Task::dependencies_finished`].
    pub fn is_ready(&self) -> bool {
        self.state() == State::Ready
    }

    pub fn is_executing(&self) -> bool {
        self.state() == State::Executing
    }

    pub fn is_finished(&self) -> bool {
        self.state() == State::Finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.cancelled.load(Ordering::SeqCst)
    }

    fn set_state(&self, to: State) {
        let from = self.state();
        self.notify(StateEvent::WillChange { from, to });

        *self.core.state.write() = to;

        if to == State::Finished && !self.manages_own_progress() {
            self.progress().complete();
        }

        #[cfg(feature = "tracing")]
        trace!(task_id = self.core.id.0, %from, %to, "task state changed");

        self.notify(StateEvent::DidChange { from, to });
    }

    fn notify(&self, event: StateEvent) {
        let observers = self.core.observers.lock().clone();
        for observer in observers {
            observer(self, event);
        }
    }

    /// Register an observer for every state mutation, cancellation and completion.
    ///
    /// Observers run on the thread performing the change, after the state lock has been
    /// released.
    pub fn observe_state(&self, observer: impl Fn(&Task, StateEvent) + Send + Sync + 'static) {
        self.core.observers.lock().push(Arc::new(observer));
    }

    // ---------------------------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------------------------

    /// Require `dependency` to finish before this task may start.
    pub fn add_dependency(&self, dependency: &Task) {
        let added = {
            let mut dependencies = self.core.dependencies.write();
            let known = dependencies.iter().any(|d| d == dependency);
            if !known {
                dependencies.push(dependency.clone());
            }
            !known
        };
        if added {
            self.notify(StateEvent::DependenciesChanged);
        }
    }

    pub fn remove_dependency(&self, dependency: &Task) {
        let removed = {
            let mut dependencies = self.core.dependencies.write();
            let before = dependencies.len();
            dependencies.retain(|d| d != dependency);
            dependencies.len() != before
        };
        if removed {
            self.notify(StateEvent::DependenciesChanged);
        }
    }

    /// Direct dependencies, in the order they were added.
    pub fn dependencies(&self) -> Vec<Task> {
        self.core.dependencies.read().clone()
    }

    pub fn dependencies_finished(&self) -> bool {
        self.core.dependencies.read().iter().all(Task::is_finished)
    }

    // ---------------------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------------------

    /// Begin executing the task.
    ///
    /// Only the first call has any effect. A cancelled task skips its work and finishes
    /// immediately; its finish hooks still run.
    pub fn start(&self) {
        if self.core.started.swap(true, Ordering::SeqCst) || self.is_finished() {
            return;
        }

        if self.is_cancelled() {
            #[cfg(feature = "tracing")]
            debug!(task_id = self.core.id.0, "task cancelled before start, finishing");

            self.finish();
            return;
        }

        events::post(EventKind::WillStart, self);
        self.run_hooks(|hooks| &mut hooks.will_start);

        self.set_state(State::Executing);
        *self.core.started_at.lock() = Some(Instant::now());

        events::post(EventKind::DidStart, self);
        self.run_hooks(|hooks| &mut hooks.did_start);

        self.run_body();
    }

    /// Invoke the work, then again for every retry requested while it was running.
    ///
    /// Retries requested from inside `execute` are looped here instead of recursing, so
    /// the stack depth stays constant however many times a body is retried.
    fn run_body(&self) {
        *self.core.body.lock() = Body::Running;
        loop {
            self.core.work.execute(self);

            let mut body = self.core.body.lock();
            if *body == Body::RerunRequested {
                *body = Body::Running;
            } else {
                *body = Body::Idle;
                return;
            }
        }
    }

    /// Mark the task's work as complete.
    ///
    /// Calling this again after the task has finished has no effect. Before committing,
    /// the work is asked whether it wants to run again (see [`Work::before_finish`]).
    pub fn finish(&self) {
        if self.core.committed.load(Ordering::SeqCst) {
            return;
        }

        if self.core.work.before_finish(self) == Finish::Retry {
            let mut body = self.core.body.lock();
            if *body == Body::Idle {
                // Finished from outside the body, e.g. a worker thread it handed off to.
                drop(body);
                self.run_body();
            } else {
                *body = Body::RerunRequested;
            }
            return;
        }

        if self.core.committed.swap(true, Ordering::SeqCst) {
            return;
        }

        events::post(EventKind::WillFinish, self);
        self.run_hooks(|hooks| &mut hooks.will_finish);

        self.set_state(State::Finished);
        *self.core.finished_at.lock() = Some(Instant::now());

        events::post(EventKind::DidFinish, self);
        self.run_hooks(|hooks| &mut hooks.did_finish);

        self.notify(StateEvent::Completed);
    }

    /// Request cancellation.
    ///
    /// A task that has not started will skip its work. A running task is only flagged;
    /// its work decides whether to observe [`Task::is_cancelled`]. Cancellation is
    /// forwarded to the task's internal queue, if it has one.
    pub fn cancel(&self) {
        if self.core.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        #[cfg(feature = "tracing")]
        debug!(task_id = self.core.id.0, state = %self.state(), "task cancelled");

        if let Some(queue) = self.core.internal_queue.get() {
            queue.cancel_all();
        }

        self.notify(StateEvent::Cancelled);
    }

    fn run_hooks(&self, select: impl FnOnce(&mut Hooks) -> &mut Vec<Hook>) {
        let hooks = std::mem::take(select(&mut self.core.hooks.lock()));
        for hook in hooks {
            hook(self);
        }
    }

    /// Called just before the task begins executing. Inputs may not be set yet.
    pub fn add_will_start_hook(&self, hook: impl FnOnce(&Task) + Send + 'static) {
        self.core.hooks.lock().will_start.push(Box::new(hook));
    }

    pub fn add_did_start_hook(&self, hook: impl FnOnce(&Task) + Send + 'static) {
        self.core.hooks.lock().did_start.push(Box::new(hook));
    }

    /// Called once, just before the task commits to `Finished`. Outputs are set by now.
    pub fn add_will_finish_hook(&self, hook: impl FnOnce(&Task) + Send + 'static) {
        self.core.hooks.lock().will_finish.push(Box::new(hook));
    }

    /// Called once, right after the task is `Finished`.
    pub fn add_did_finish_hook(&self, hook: impl FnOnce(&Task) + Send + 'static) {
        self.core.hooks.lock().did_finish.push(Box::new(hook));
    }

    // ---------------------------------------------------------------------------------
    // Progress and timing
    // ---------------------------------------------------------------------------------

    pub fn progress(&self) -> Progress {
        self.core.progress.read().clone()
    }

    /// Replace the task's progress counter. The task will no longer complete it
    /// automatically on finish.
    pub fn set_progress(&self, progress: Progress) {
        *self.core.progress.write() = progress;
        self.set_manages_own_progress(true);
    }

    pub fn manages_own_progress(&self) -> bool {
        self.core.manages_own_progress.load(Ordering::SeqCst)
    }

    /// When set, finishing does not mark the progress counter complete.
    pub fn set_manages_own_progress(&self, manages: bool) {
        self.core
            .manages_own_progress
            .store(manages, Ordering::SeqCst);
    }

    /// Weight of this task in aggregated progress. Defaults to 1.
    pub fn estimated_work(&self) -> u64 {
        self.core.estimated_work.load(Ordering::SeqCst)
    }

    pub fn set_estimated_work(&self, units: u64) {
        self.core.estimated_work.store(units, Ordering::SeqCst);
    }

    pub fn started_at(&self) -> Option<Instant> {
        *self.core.started_at.lock()
    }

    pub fn finished_at(&self) -> Option<Instant> {
        *self.core.finished_at.lock()
    }

    /// Time since start, or between start and finish once finished. Zero if never started.
    pub fn execution_time(&self) -> Duration {
        let Some(start) = self.started_at() else {
            return Duration::ZERO;
        };
        let end = self.finished_at().unwrap_or_else(Instant::now);
        end.saturating_duration_since(start)
    }

    /// A queue private to this task, created on first use. Cancelling the task cancels
    /// everything still tracked by this queue.
    pub fn internal_queue(&self) -> &Queue {
        self.core.internal_queue.get_or_init(|| {
            let label = self.name().unwrap_or_else(|| self.core.id.0.to_string());
            Queue::builder()
                .name(format!("taskchain.internal.{label}"))
                .build()
        })
    }
}

impl Drop for Core {
    // Unlink long dependency chains iteratively rather than through nested drops.
    fn drop(&mut self) {
        let mut orphans = std::mem::take(self.dependencies.get_mut());
        while let Some(task) = orphans.pop() {
            if let Ok(mut core) = Arc::try_unwrap(task.core) {
                orphans.append(core.dependencies.get_mut());
            }
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for Task {}

impl std::hash::Hash for Task {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.core.id.hash(state);
    }
}

impl AsRef<Task> for Task {
    fn as_ref(&self) -> &Task {
        self
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task(name: '{}', state: {})",
            self.name().as_deref().unwrap_or("nil"),
            self.state()
        )
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .field("name", &self.name())
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
