//! Executor queue.
//!
//! A [`Queue`] tracks submitted tasks and hands each one to its [`Spawner`] once the task
//! is ready to run: it has not started, and it is either cancelled or all of its
//! dependencies are finished. Completion is observed through task state notifications,
//! so a task's work may finish on any thread.
//!
//! The queue owns no threads. Where jobs run is the spawner's business: rayon's global
//! pool by default, a dedicated [`rayon::ThreadPool`], a thread per job, the submitting
//! thread, or any closure.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[cfg(feature = "tracing")]
use tracing::{debug, error, trace};

use crate::task::Task;
use crate::types::{State, StateEvent, TaskId};

/// A unit of work handed to a [`Spawner`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Decides where queued jobs run.
///
/// # Examples
///
/// ```
/// use taskchain::{Queue, Spawner};
///
/// let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
/// let queue = Queue::builder()
///     .name("io")
///     .spawner(Spawner::pool(pool))
///     .build();
/// assert_eq!(queue.name(), "io");
/// ```
#[derive(Clone)]
pub struct Spawner(Arc<dyn Fn(Job) + Send + Sync>);

impl Spawner {
    /// Wrap any function that runs a job, e.g. `|job| { tokio::task::spawn_blocking(job); }`.
    pub fn new(spawn: impl Fn(Job) + Send + Sync + 'static) -> Self {
        Self(Arc::new(spawn))
    }

    /// Run jobs on rayon's global thread pool.
    pub fn rayon() -> Self {
        Self::new(|job| rayon::spawn(job))
    }

    /// Run jobs on a dedicated rayon pool.
    pub fn pool(pool: rayon::ThreadPool) -> Self {
        let pool = Arc::new(pool);
        Self::new(move |job| pool.spawn(job))
    }

    /// Run each job on a new OS thread.
    pub fn thread() -> Self {
        Self::new(|job| {
            std::thread::spawn(job);
        })
    }

    /// Run jobs on the submitting thread, before the submitting call returns.
    ///
    /// Jobs spawned while another inline job is running on the same thread are deferred
    /// until it returns, so long chains do not nest on the stack.
    pub fn inline() -> Self {
        Self::new(run_inline)
    }

    fn spawn(&self, job: Job) {
        (self.0)(job)
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::rayon()
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Spawner")
    }
}

thread_local! {
    static CURRENT_QUEUE: RefCell<Option<Arc<str>>> = const { RefCell::new(None) };
    static INLINE_JOBS: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

fn run_inline(job: Job) {
    let first = INLINE_JOBS.with(|jobs| {
        let mut jobs = jobs.borrow_mut();
        match jobs.as_mut() {
            Some(deferred) => {
                deferred.push_back(job);
                None
            }
            None => {
                *jobs = Some(VecDeque::new());
                Some(job)
            }
        }
    });
    let Some(mut job) = first else {
        return;
    };

    let _draining = InlineDrain;
    loop {
        job();
        let next = INLINE_JOBS.with(|jobs| jobs.borrow_mut().as_mut().and_then(VecDeque::pop_front));
        match next {
            Some(deferred) => job = deferred,
            None => return,
        }
    }
}

// Ends the drain on this thread, also when a job unwinds.
struct InlineDrain;

impl Drop for InlineDrain {
    fn drop(&mut self) {
        INLINE_JOBS.with(|jobs| jobs.borrow_mut().take());
    }
}

// Restores the previous queue name when a job returns or unwinds.
struct CurrentQueue {
    previous: Option<Arc<str>>,
}

impl CurrentQueue {
    fn enter(name: Arc<str>) -> Self {
        let previous = CURRENT_QUEUE.with(|current| current.replace(Some(name)));
        Self { previous }
    }
}

impl Drop for CurrentQueue {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_QUEUE.with(|current| *current.borrow_mut() = previous);
    }
}

/// Configuration for a [`Queue`].
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    name: Option<String>,
    spawner: Spawner,
    max_concurrent: Option<usize>,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    /// Bound the number of tasks dispatched but not yet finished. Zero is treated as one.
    pub fn max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = Some(limit.max(1));
        self
    }

    pub fn build(self) -> Queue {
        let name: Arc<str> = self.name.unwrap_or_else(|| "taskchain.queue".to_string()).into();

        #[cfg(feature = "tracing")]
        debug!(queue = &*name, max_concurrent = ?self.max_concurrent, "queue created");

        Queue {
            inner: Arc::new(Inner {
                name,
                spawner: self.spawner,
                max_concurrent: self.max_concurrent,
                tracked: Mutex::new(Tracked::default()),
                idle: Condvar::new(),
            }),
        }
    }
}

/// Runs tasks once their dependencies are finished.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    spawner: Spawner,
    max_concurrent: Option<usize>,
    tracked: Mutex<Tracked>,
    idle: Condvar,
}

#[derive(Default)]
struct Tracked {
    /// Source of submission sequence numbers.
    next_seq: u64,
    /// Submitted, waiting on dependencies.
    pending: HashMap<TaskId, (u64, Task)>,
    /// Runnable, waiting for a concurrency slot. Keyed by submission sequence.
    ready: BTreeMap<u64, Task>,
    /// Dispatched or started elsewhere, not yet finished.
    running: HashMap<TaskId, Task>,
    /// Everything in `pending`, `ready` or `running`.
    queued: HashSet<TaskId>,
    /// Pending tasks to re-examine on the next pump.
    recheck: Vec<TaskId>,
    /// Unfinished dependency → pending tasks waiting on it.
    waiting: HashMap<TaskId, Vec<TaskId>>,
    /// Unfinished tasks this queue has a state observer on.
    observed: HashSet<TaskId>,
    /// Tasks to put an observer on once the lock is released.
    unwatched: Vec<Task>,
}

impl Tracked {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty() && self.running.is_empty()
    }

    fn len(&self) -> usize {
        self.pending.len() + self.ready.len() + self.running.len()
    }

    fn watch(&mut self, task: &Task) {
        if self.observed.insert(task.id()) {
            self.unwatched.push(task.clone());
        }
    }

    /// Forget a finished task and re-examine everything that waited on it.
    fn retire(&mut self, id: TaskId) {
        self.running.remove(&id);
        self.pending.remove(&id);
        self.queued.remove(&id);
        self.observed.remove(&id);
        if let Some(waiters) = self.waiting.remove(&id) {
            self.recheck.extend(waiters);
        }
    }

    /// Sort rechecked tasks into ready, running or waiting, then claim as many ready tasks
    /// as the concurrency limit allows.
    fn settle(&mut self, max_concurrent: Option<usize>) -> Vec<Task> {
        while let Some(id) = self.recheck.pop() {
            let Some((seq, task)) = self.pending.get(&id).cloned() else {
                continue;
            };

            match task.state() {
                State::Finished => {
                    self.pending.remove(&id);
                    self.queued.remove(&id);
                }
                // Started elsewhere; wait for its completion like any dispatched task.
                State::Executing => {
                    self.pending.remove(&id);
                    self.running.insert(id, task);
                }
                State::Ready => {
                    let blockers: Vec<Task> = if task.is_cancelled() {
                        Vec::new()
                    } else {
                        task.dependencies()
                            .into_iter()
                            .filter(|dependency| !dependency.is_finished())
                            .collect()
                    };

                    if blockers.is_empty() {
                        self.pending.remove(&id);
                        self.ready.insert(seq, task);
                    } else {
                        for blocker in &blockers {
                            let waiters = self.waiting.entry(blocker.id()).or_default();
                            if !waiters.contains(&id) {
                                waiters.push(id);
                            }
                            self.watch(blocker);
                        }
                    }
                }
            }
        }

        let mut dispatch = Vec::new();
        while max_concurrent.map_or(true, |limit| self.running.len() < limit) {
            let Some((_, task)) = self.ready.pop_first() else {
                break;
            };
            // Finished elsewhere while waiting for a slot.
            if task.is_finished() {
                self.queued.remove(&task.id());
                continue;
            }
            self.running.insert(task.id(), task.clone());
            dispatch.push(task);
        }
        dispatch
    }
}

impl Default for Queue {
    fn default() -> Self {
        QueueBuilder::default().build()
    }
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the queue whose job is running on the current thread, if any.
    pub fn current_name() -> Option<String> {
        CURRENT_QUEUE.with(|current| current.borrow().as_deref().map(str::to_string))
    }

    /// Queue tasks. Tasks already finished or already queued here are skipped.
    ///
    /// Only the given tasks are queued, not their dependencies; see [`Queue::submit_all`]
    /// and [`Task::submit`] for submitting whole chains.
    pub fn add_tasks<I>(&self, tasks: I)
    where
        I: IntoIterator,
        I::Item: AsRef<Task>,
    {
        {
            let mut tracked = self.inner.tracked.lock();
            for task in tasks {
                let task = task.as_ref();
                if task.is_finished() || !tracked.queued.insert(task.id()) {
                    continue;
                }
                let seq = tracked.next_seq;
                tracked.next_seq += 1;
                tracked.pending.insert(task.id(), (seq, task.clone()));
                tracked.recheck.push(task.id());
                tracked.watch(task);
            }
        }

        self.inner.pump();
    }

    pub fn add_task(&self, task: &Task) {
        self.add_tasks(std::iter::once(task));
    }

    /// Submit the union of the given tasks' chains in one batch. Tasks shared between
    /// chains are queued once.
    ///
    /// ```
    /// use taskchain::{block, Queue, Task};
    ///
    /// let shared = block::value(1);
    /// let left = block::run(|| {});
    /// let right = block::run(|| {});
    /// shared.then(&left);
    /// shared.then(&right);
    ///
    /// let queue = Queue::new();
    /// queue.submit_all::<[&Task; 2]>([&left, &right]);
    /// queue.wait_until_all_finished();
    /// assert!(shared.is_finished() && left.is_finished() && right.is_finished());
    /// ```
    pub fn submit_all<I>(&self, tasks: I)
    where
        I: IntoIterator,
        I::Item: AsRef<Task>,
    {
        let mut seen = HashSet::new();
        let mut union = Vec::new();
        for task in tasks {
            for member in task.as_ref().chain() {
                if seen.insert(member.id()) {
                    union.push(member);
                }
            }
        }

        #[cfg(feature = "tracing")]
        debug!(queue = self.name(), count = union.len(), "submitting chains");

        self.add_tasks(union);
    }

    /// Number of tasks pending or running.
    pub fn len(&self) -> usize {
        self.inner.tracked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tracked.lock().is_idle()
    }

    /// Alias of [`Queue::is_empty`].
    pub fn is_idle(&self) -> bool {
        self.is_empty()
    }

    /// Snapshot of the tasks pending or running.
    pub fn tasks(&self) -> Vec<Task> {
        let tracked = self.inner.tracked.lock();
        tracked
            .pending
            .values()
            .map(|(_, task)| task)
            .chain(tracked.ready.values())
            .chain(tracked.running.values())
            .cloned()
            .collect()
    }

    /// Cancel every task still pending or running. Finished tasks are untouched.
    pub fn cancel_all(&self) {
        let tasks = self.tasks();

        #[cfg(feature = "tracing")]
        debug!(queue = self.name(), count = tasks.len(), "cancelling all tasks");

        for task in tasks {
            task.cancel();
        }
    }

    /// Block until nothing is pending or running.
    ///
    /// Must not be called from a job running on this queue with a bounded spawner, since
    /// the caller's own task would never finish.
    pub fn wait_until_all_finished(&self) {
        let mut tracked = self.inner.tracked.lock();
        while !tracked.is_idle() {
            self.inner.idle.wait(&mut tracked);
        }
    }

    /// Like [`Queue::wait_until_all_finished`] with a deadline. Returns `true` if the queue
    /// became idle in time.
    pub fn wait_until_all_finished_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut tracked = self.inner.tracked.lock();
        while !tracked.is_idle() {
            if self
                .inner
                .idle
                .wait_until(&mut tracked, deadline)
                .timed_out()
            {
                return tracked.is_idle();
            }
        }
        true
    }
}

impl Inner {
    fn observe(self: &Arc<Self>, task: &Task) {
        let queue = Arc::downgrade(self);
        task.observe_state(move |task, event| {
            let Some(queue) = queue.upgrade() else {
                return;
            };
            match event {
                StateEvent::Completed => queue.completed(task),
                StateEvent::Cancelled | StateEvent::DependenciesChanged => {
                    queue.tracked.lock().recheck.push(task.id());
                    queue.pump();
                }
                _ => {}
            }
        });
    }

    fn completed(self: &Arc<Self>, task: &Task) {
        self.tracked.lock().retire(task.id());

        #[cfg(feature = "tracing")]
        trace!(queue = &*self.name, task_id = task.id().0, "task completed");

        self.pump();
    }

    /// Dispatch every rechecked task that may run now.
    fn pump(self: &Arc<Self>) {
        loop {
            let (dispatch, unwatched, idle) = {
                let mut tracked = self.tracked.lock();
                let dispatch = tracked.settle(self.max_concurrent);
                let unwatched = std::mem::take(&mut tracked.unwatched);
                (dispatch, unwatched, tracked.is_idle())
            };

            if idle {
                self.idle.notify_all();
            }

            // A task that finished before its observer was in place never reports back.
            let mut missed = Vec::new();
            for task in unwatched {
                self.observe(&task);
                if task.is_finished() {
                    missed.push(task.id());
                }
            }

            for task in dispatch {
                #[cfg(feature = "tracing")]
                trace!(queue = &*self.name, task_id = task.id().0, "dispatching task");

                let name = Arc::clone(&self.name);
                self.spawner.spawn(Box::new(move || run(name, task)));
            }

            if missed.is_empty() {
                return;
            }
            let mut tracked = self.tracked.lock();
            for id in missed {
                tracked.retire(id);
            }
        }
    }
}

fn run(queue: Arc<str>, task: Task) {
    let _current = CurrentQueue::enter(queue);

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| task.start()));

    if let Err(panic) = outcome {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        #[cfg(feature = "tracing")]
        error!(task_id = task.id().0, %message, "task panicked, finishing it");
        #[cfg(not(feature = "tracing"))]
        let _ = message;

        // A panicking body never reaches finish(); finish here so dependents and waiters
        // are not stuck. Outputs keep whatever the body managed to set.
        task.finish();
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracked = self.inner.tracked.lock();
        f.debug_struct("Queue")
            .field("name", &self.inner.name)
            .field("pending", &(tracked.pending.len() + tracked.ready.len()))
            .field("running", &tracked.running.len())
            .field("max_concurrent", &self.inner.max_concurrent)
            .finish()
    }
}
