//! Task Graph Execution Core
//!
//! Compose units of work into dependency graphs, run them concurrently, and pass typed
//! results from producers to consumers along the way.
//!
//! # Features
//!
//! - **Explicit lifecycle**: every task moves `Ready → Executing → Finished` exactly once.
//!   Work decides when it is done by calling [`Task::finish`], so asynchronous hand-offs
//!   are first-class.
//! - **Typed result wiring**: [`TaskHandle::passes_result`] only compiles when the
//!   consumer's input type matches the producer's output type.
//! - **Failures are values**: a failure is stored as the `Err` of a [`TaskResult`] and
//!   flows downstream like any other result. Nothing panics across task boundaries.
//! - **Composable building blocks**: closure tasks ([`block`]), transforms ([`Map`]),
//!   fan-in ([`Combine`]), sub-chains as a single task ([`Group`]) and retry policies
//!   ([`Retrying`]).
//! - **Hierarchical progress**: [`Progress`] counters weighted by estimated work compose
//!   across nested groups.
//! - **Pluggable execution**: a [`Queue`] decides *when* a task may run; a [`Spawner`]
//!   decides *where*. Rayon's global pool is the default.
//!
//! # Quick Start
//!
//! ```
//! use taskchain::{block, map_value, Combine, Queue};
//!
//! let queue = Queue::new();
//!
//! let width = block::value(6);
//! let height = block::value(7);
//! let area = Combine::new();
//! width.appends_result_to(&area);
//! height.appends_result_to(&area);
//!
//! let report = area.passes_result(&map_value(|sides: Vec<i32>| {
//!     Ok(format!("area = {}", sides.iter().product::<i32>()))
//! }));
//!
//! report.submit(&queue);
//! queue.wait_until_all_finished();
//!
//! assert_eq!(report.output().unwrap(), "area = 42");
//! ```
//!
//! # Core Concepts
//!
//! ## Task and Work
//!
//! A [`Task`] is a cheap, cloneable handle carrying identity, state, dependencies, hooks
//! and progress. What the task *does* is its [`Work`]: implement [`Work::execute`] and
//! call [`Task::finish`] once done, possibly from another thread.
//!
//! ```
//! use taskchain::{Queue, Task, Work};
//! use std::thread;
//!
//! struct Download;
//!
//! impl Work for Download {
//!     fn execute(&self, task: &Task) {
//!         let task = task.clone();
//!         thread::spawn(move || {
//!             // ... talk to the network ...
//!             task.finish();
//!         });
//!     }
//! }
//!
//! let queue = Queue::new();
//! let download = Task::new(Download);
//! download.submit(&queue);
//! queue.wait_until_all_finished();
//! assert!(download.is_finished());
//! ```
//!
//! ## TaskHandle
//!
//! A [`TaskHandle<W>`] is a task plus typed access to its work. It dereferences to
//! [`Task`]. Work implementing [`Produces`], [`Consumes`] or [`ConsumesMany`] unlocks the
//! result wiring operations on its handle.
//!
//! ## Dependencies and Chains
//!
//! `a.then(&b)` makes `b` wait for `a`. A task's [`chain`](Task::chain) is everything it
//! transitively depends on, dependencies first, and submitting a task submits its chain:
//!
//! ```
//! use taskchain::{block, Queue};
//!
//! let fetch = block::value("payload");
//! let parse = block::run(|| {});
//! let store = block::run(|| {});
//! fetch.then(&parse).then(&store);
//!
//! assert_eq!(store.chain().len(), 3);
//!
//! let queue = Queue::new();
//! store.submit(&queue);
//! queue.wait_until_all_finished();
//! assert!(fetch.is_finished());
//! ```
//!
//! Acyclicity is the caller's responsibility. [`Task::chain`] terminates on a cycle, and
//! [`Task::try_chain`] reports one as a [`GraphError`].
//!
//! ## Results
//!
//! Producers start with `Err(NoResult)` in their output. Wiring copies the output into
//! the consumer just before the producer finishes, so a consumer's input is in place by
//! the time it may start. A cancelled producer copies nothing. Fan-in consumers such as
//! [`Combine`] collect one result per producer in completion order.
//!
//! ## Cancellation
//!
//! [`Task::cancel`] is cooperative. A task cancelled before it starts skips its work and
//! finishes straight away; a running task only has its flag set. Cancelling a [`Group`]
//! also cancels whatever is still pending or running inside it.
//!
//! # Tracing
//!
//! Enable the `tracing` feature for structured logs:
//!
//! ```toml
//! [dependencies]
//! taskchain = { version = "0.1", features = ["tracing"] }
//! ```
//!
//! ## Log Levels
//!
//! - **DEBUG**: lifecycle notifications, chain submission, group decisions, retries
//! - **TRACE**: state transitions, queue dispatch and completion, result passing
//! - **ERROR**: panicking task bodies
//!
//! When the feature is disabled (the default) logging is compiled out entirely.
//! Lifecycle notifications remain available to code through [`events::subscribe`].

// Module declarations
pub mod block;
mod chain;
mod combine;
mod error;
pub mod events;
mod group;
mod handle;
mod map;
mod progress;
mod queue;
mod result;
mod retry;
mod task;
mod types;

// Public re-exports
pub use block::BlockTask;
pub use combine::{combine, Combine};
pub use error::{outcome, GraphError, TaskError, TaskResult};
pub use group::Group;
pub use handle::TaskHandle;
pub use map::{map_result, map_value, Map, ResultFn, Transform, ValueFn};
pub use progress::{chain_progress, Progress};
pub use queue::{Job, Queue, QueueBuilder, Spawner};
pub use result::{passes_results, Collector, Consumes, ConsumesMany, Produces, Slot};
pub use retry::{retrying, RetryPolicy, RetryStrategy, Retrying};
pub use task::{Finish, Task, WeakTask, Work};
pub use types::{State, StateEvent, TaskId};
