//! Single-input transforms.
//!
//! A [`Map`] task consumes one result and produces another through a [`Transform`]. A
//! transform either works on values, letting failures pass through untouched, or on whole
//! results when it needs to recover from or rewrite failures.

use std::fmt;
use std::marker::PhantomData;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::{TaskError, TaskResult};
use crate::handle::TaskHandle;
use crate::result::{Consumes, Produces, Slot};
use crate::task::{Task, Work};

/// A mapping from an input result to an output result.
///
/// Override exactly one of the two methods. The default `map_result` forwards successful
/// inputs to `map_value` and passes failures through unchanged.
pub trait Transform: Send + Sync + 'static {
    type Input: Clone + Send + 'static;
    type Output: Clone + Send + 'static;

    fn map_value(&self, input: Self::Input) -> TaskResult<Self::Output> {
        let _ = input;
        Err(TaskError::NotImplemented("Transform::map_value"))
    }

    fn map_result(&self, input: TaskResult<Self::Input>) -> TaskResult<Self::Output> {
        input.and_then(|value| self.map_value(value))
    }
}

/// Task applying a [`Transform`] to its input.
pub struct Map<T: Transform> {
    transform: T,
    input: Slot<T::Input>,
    output: Slot<T::Output>,
}

impl<T: Transform> Map<T> {
    pub fn new(transform: T) -> TaskHandle<Self> {
        TaskHandle::new(Self::body(transform))
    }

    /// A map task whose input is already known.
    pub fn with_input(transform: T, input: T::Input) -> TaskHandle<Self> {
        TaskHandle::new(Self {
            transform,
            input: Slot::with(Ok(input)),
            output: Slot::new(),
        })
    }

    /// The bare work, for wrapping in a decorator such as [`crate::Retrying`].
    pub fn body(transform: T) -> Self {
        Self {
            transform,
            input: Slot::new(),
            output: Slot::new(),
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }
}

impl<T: Transform> Work for Map<T> {
    fn execute(&self, task: &Task) {
        let result = self.transform.map_result(self.input.get());

        #[cfg(feature = "tracing")]
        trace!(task_id = task.id().0, ok = result.is_ok(), "mapped input");

        self.output.set(result);
        task.finish();
    }
}

impl<T: Transform> Produces for Map<T> {
    type Output = T::Output;

    fn output(&self) -> &Slot<T::Output> {
        &self.output
    }
}

impl<T: Transform> Consumes for Map<T> {
    type Input = T::Input;

    fn input(&self) -> &Slot<T::Input> {
        &self.input
    }
}

impl<T: Transform> fmt::Debug for Map<T>
where
    T::Input: fmt::Debug,
    T::Output: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Value-level transform from a closure. See [`map_value`].
pub struct ValueFn<I, O, F> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> Transform for ValueFn<I, O, F>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: Fn(I) -> TaskResult<O> + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn map_value(&self, input: I) -> TaskResult<O> {
        (self.f)(input)
    }
}

/// Result-level transform from a closure. See [`map_result`].
pub struct ResultFn<I, O, F> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> Transform for ResultFn<I, O, F>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: Fn(TaskResult<I>) -> TaskResult<O> + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn map_result(&self, input: TaskResult<I>) -> TaskResult<O> {
        (self.f)(input)
    }
}

/// A map task applying `f` to a successful input. Failed inputs pass through unchanged
/// and `f` is not called.
pub fn map_value<I, O, F>(f: F) -> TaskHandle<Map<ValueFn<I, O, F>>>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: Fn(I) -> TaskResult<O> + Send + Sync + 'static,
{
    Map::new(ValueFn {
        f,
        _marker: PhantomData,
    })
}

/// A map task applying `f` to the whole input result.
pub fn map_result<I, O, F>(f: F) -> TaskHandle<Map<ResultFn<I, O, F>>>
where
    I: Clone + Send + 'static,
    O: Clone + Send + 'static,
    F: Fn(TaskResult<I>) -> TaskResult<O> + Send + Sync + 'static,
{
    Map::new(ResultFn {
        f,
        _marker: PhantomData,
    })
}
