//! Fan-in of many results into one.

use std::fmt;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::{TaskError, TaskResult};
use crate::handle::TaskHandle;
use crate::result::{Collector, ConsumesMany, Produces, Slot};
use crate::task::{Task, Work};

/// Collapse an ordered list of results.
///
/// An empty list is `Err(NoResult)`. If any result failed, the outcome is
/// `Err(Aggregate)` carrying every failure in input order. Otherwise it is the list of
/// values in input order.
///
/// ```
/// use taskchain::{combine, TaskError};
///
/// assert_eq!(combine(vec![Ok(1), Ok(2)]), Ok(vec![1, 2]));
/// assert_eq!(combine::<i32>(vec![]), Err(TaskError::NoResult));
/// assert!(matches!(
///     combine(vec![Ok(1), Err(TaskError::NoResult)]),
///     Err(TaskError::Aggregate(errors)) if errors.len() == 1
/// ));
/// ```
pub fn combine<T>(results: Vec<TaskResult<T>>) -> TaskResult<Vec<T>> {
    if results.is_empty() {
        return Err(TaskError::NoResult);
    }

    let mut values = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(TaskError::Aggregate(errors))
    }
}

/// Task combining every result appended to it.
///
/// Feed it with [`TaskHandle::appends_result_to`] or [`crate::passes_results`], or seed
/// it with [`Combine::with_inputs`].
pub struct Combine<T> {
    inputs: Collector<T>,
    output: Slot<Vec<T>>,
}

impl<T: Clone + Send + 'static> Combine<T> {
    pub fn new() -> TaskHandle<Self> {
        Self::with_inputs(Vec::new())
    }

    pub fn with_inputs(inputs: Vec<TaskResult<T>>) -> TaskHandle<Self> {
        TaskHandle::new(Self {
            inputs: Collector::with(inputs),
            output: Slot::new(),
        })
    }
}

impl<T: Clone + Send + 'static> Work for Combine<T> {
    fn execute(&self, task: &Task) {
        let inputs = self.inputs.snapshot();

        #[cfg(feature = "tracing")]
        trace!(task_id = task.id().0, inputs = inputs.len(), "combining results");

        self.output.set(combine(inputs));
        task.finish();
    }
}

impl<T: Clone + Send + 'static> Produces for Combine<T> {
    type Output = Vec<T>;

    fn output(&self) -> &Slot<Vec<T>> {
        &self.output
    }
}

impl<T: Clone + Send + 'static> ConsumesMany for Combine<T> {
    type Input = T;

    fn inputs(&self) -> &Collector<T> {
        &self.inputs
    }
}

impl<T: fmt::Debug> fmt::Debug for Combine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combine")
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .finish()
    }
}
