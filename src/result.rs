//! Typed result passing between tasks.
//!
//! Producers own an output [`Slot`], consumers an input [`Slot`], and fan-in consumers a
//! [`Collector`]. Wiring a producer to a consumer adds the dependency edge and a
//! will-finish hook on the producer that copies its output across. Because the hook runs
//! before the producer is marked finished, a consumer's input is always populated by the
//! time its dependencies are satisfied.
//!
//! Wiring hooks hold the two works, not the tasks, so wiring never keeps a task graph
//! alive through a reference cycle.

use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::{TaskError, TaskResult};
use crate::handle::TaskHandle;
use crate::progress::Progress;
use crate::queue::Queue;
use crate::task::Work;

/// A single result cell, initially `Err(NoResult)`.
pub struct Slot<T> {
    value: Mutex<TaskResult<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self::with(Err(TaskError::NoResult))
    }

    pub fn with(value: TaskResult<T>) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    pub fn set(&self, value: TaskResult<T>) {
        *self.value.lock() = value;
    }

    /// Move the result out, leaving `Err(NoResult)` behind.
    pub fn take(&self) -> TaskResult<T> {
        std::mem::replace(&mut *self.value.lock(), Err(TaskError::NoResult))
    }

    pub fn is_ok(&self) -> bool {
        self.value.lock().is_ok()
    }

    /// The error currently held, if any.
    pub fn error(&self) -> Option<TaskError> {
        self.value.lock().as_ref().err().cloned()
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> TaskResult<T> {
        self.value.lock().clone()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.value.lock()).finish()
    }
}

/// An ordered, append-only list of results for fan-in consumers.
pub struct Collector<T> {
    results: Mutex<Vec<TaskResult<T>>>,
}

impl<T> Collector<T> {
    pub fn new() -> Self {
        Self::with(Vec::new())
    }

    pub fn with(results: Vec<TaskResult<T>>) -> Self {
        Self {
            results: Mutex::new(results),
        }
    }

    pub fn push(&self, result: TaskResult<T>) {
        self.results.lock().push(result);
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }
}

impl<T: Clone> Collector<T> {
    pub fn snapshot(&self) -> Vec<TaskResult<T>> {
        self.results.lock().clone()
    }
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collector")
            .field(&*self.results.lock())
            .finish()
    }
}

/// Work that produces a typed result.
pub trait Produces: Work {
    type Output: Clone + Send + 'static;

    fn output(&self) -> &Slot<Self::Output>;
}

/// Work that consumes a single typed result.
pub trait Consumes: Work {
    type Input: Clone + Send + 'static;

    fn input(&self) -> &Slot<Self::Input>;
}

/// Work that consumes an ordered list of typed results.
pub trait ConsumesMany: Work {
    type Input: Clone + Send + 'static;

    fn inputs(&self) -> &Collector<Self::Input>;
}

impl<P: Produces> TaskHandle<P> {
    pub fn output(&self) -> TaskResult<P::Output> {
        self.work().output().get()
    }

    /// Make `consumer` depend on this task and receive its output.
    ///
    /// The output is copied when this task finishes, unless it was cancelled, in which
    /// case the consumer's input stays `Err(NoResult)`. Returns `consumer` for chaining.
    ///
    /// ```
    /// use taskchain::{block, map_value, Queue};
    ///
    /// let queue = Queue::new();
    /// let doubled = block::from_fn(|| Ok(21)).passes_result(&map_value(|n: i32| Ok(n * 2)));
    /// doubled.submit(&queue);
    /// queue.wait_until_all_finished();
    /// assert_eq!(doubled.output().unwrap(), 42);
    /// ```
    pub fn passes_result<C>(&self, consumer: &TaskHandle<C>) -> TaskHandle<C>
    where
        C: Consumes<Input = P::Output>,
    {
        consumer.add_dependency(self);

        let producer = self.work_arc();
        let target = consumer.work_arc();
        #[cfg(feature = "tracing")]
        let target_id = consumer.id();

        self.add_will_finish_hook(move |task| {
            if task.is_cancelled() {
                return;
            }

            #[cfg(feature = "tracing")]
            trace!(
                producer = task.id().0,
                consumer = target_id.0,
                "passing result"
            );

            target.input().set(producer.output().get());
        });

        consumer.clone()
    }

    /// Pass this task's output to every consumer.
    pub fn passes_result_to_each<C>(&self, consumers: &[TaskHandle<C>]) -> Vec<TaskHandle<C>>
    where
        C: Consumes<Input = P::Output>,
    {
        consumers
            .iter()
            .map(|consumer| self.passes_result(consumer))
            .collect()
    }

    /// Make `consumer` depend on this task and append its output to the consumer's inputs.
    ///
    /// Appends from several producers land in completion order.
    pub fn appends_result_to<C>(&self, consumer: &TaskHandle<C>) -> TaskHandle<C>
    where
        C: ConsumesMany<Input = P::Output>,
    {
        consumer.add_dependency(self);

        let producer = self.work_arc();
        let target = consumer.work_arc();

        self.add_will_finish_hook(move |task| {
            if !task.is_cancelled() {
                target.inputs().push(producer.output().get());
            }
        });

        consumer.clone()
    }

    /// Append this task's output to every fan-in consumer.
    pub fn appends_result_to_each<C>(&self, consumers: &[TaskHandle<C>]) -> Vec<TaskHandle<C>>
    where
        C: ConsumesMany<Input = P::Output>,
    {
        consumers
            .iter()
            .map(|consumer| self.appends_result_to(consumer))
            .collect()
    }

    /// Run `block` with this task's output once it has finished.
    ///
    /// Blocks run on the finishing thread in registration order. A block added after the
    /// task finished never runs.
    pub fn add_result_block(&self, block: impl FnOnce(TaskResult<P::Output>) + Send + 'static) {
        let producer = self.work_arc();
        self.add_did_finish_hook(move |_| block(producer.output().get()));
    }

    /// Register a result block and submit this task's chain.
    pub fn submit_with_completion(
        &self,
        queue: &Queue,
        block: impl FnOnce(TaskResult<P::Output>) + Send + 'static,
    ) -> &Self {
        self.add_result_block(block);
        self.submit(queue);
        self
    }

    /// Register a result block, submit this task's chain and return progress aggregated
    /// over it.
    pub fn submit_with_progress_and_completion(
        &self,
        queue: &Queue,
        block: impl FnOnce(TaskResult<P::Output>) + Send + 'static,
    ) -> Progress {
        self.add_result_block(block);
        self.submit_with_progress(queue)
    }

    /// A future resolved with this task's output once it has finished.
    ///
    /// Resolves to `Err(Canceled)` if the task is dropped without ever finishing.
    pub fn result_future(&self) -> oneshot::Receiver<TaskResult<P::Output>> {
        let (sender, receiver) = oneshot::channel();
        self.add_result_block(move |result| {
            let _ = sender.send(result);
        });
        receiver
    }
}

impl<C: Consumes> TaskHandle<C> {
    pub fn input(&self) -> TaskResult<C::Input> {
        self.work().input().get()
    }

    /// Seed the input directly, for a consumer with no upstream producer.
    pub fn set_input(&self, input: TaskResult<C::Input>) {
        self.work().input().set(input);
    }
}

impl<C: ConsumesMany> TaskHandle<C> {
    pub fn inputs(&self) -> Vec<TaskResult<C::Input>> {
        self.work().inputs().snapshot()
    }

    pub fn push_input(&self, input: TaskResult<C::Input>) {
        self.work().inputs().push(input);
    }
}

/// Append every producer's output to `consumer`'s inputs.
pub fn passes_results<P, C>(producers: &[TaskHandle<P>], consumer: &TaskHandle<C>) -> TaskHandle<C>
where
    P: Produces,
    C: ConsumesMany<Input = P::Output>,
{
    for producer in producers {
        producer.appends_result_to(consumer);
    }
    consumer.clone()
}
