//! Tasks built from closures.

use std::fmt;

use crate::error::TaskResult;
use crate::handle::TaskHandle;
use crate::result::{Produces, Slot};
use crate::task::{Task, Work};

/// A producer whose body is a closure returning its result.
///
/// The closure may run more than once when wrapped in [`crate::Retrying`].
pub struct BlockTask<T, F> {
    block: F,
    output: Slot<T>,
}

impl<T, F> BlockTask<T, F>
where
    T: Clone + Send + 'static,
    F: Fn() -> TaskResult<T> + Send + Sync + 'static,
{
    pub fn new(block: F) -> Self {
        Self {
            block,
            output: Slot::new(),
        }
    }
}

impl<T, F> Work for BlockTask<T, F>
where
    T: Clone + Send + 'static,
    F: Fn() -> TaskResult<T> + Send + Sync + 'static,
{
    fn execute(&self, task: &Task) {
        self.output.set((self.block)());
        task.finish();
    }
}

impl<T, F> Produces for BlockTask<T, F>
where
    T: Clone + Send + 'static,
    F: Fn() -> TaskResult<T> + Send + Sync + 'static,
{
    type Output = T;

    fn output(&self) -> &Slot<T> {
        &self.output
    }
}

impl<T: fmt::Debug, F> fmt::Debug for BlockTask<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockTask")
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// A task producing whatever `block` returns.
pub fn from_fn<T, F>(block: F) -> TaskHandle<BlockTask<T, F>>
where
    T: Clone + Send + 'static,
    F: Fn() -> TaskResult<T> + Send + Sync + 'static,
{
    TaskHandle::new(BlockTask::new(block))
}

/// A task producing `Ok(value)`.
pub fn value<T>(
    value: T,
) -> TaskHandle<BlockTask<T, impl Fn() -> TaskResult<T> + Send + Sync + 'static>>
where
    T: Clone + Send + Sync + 'static,
{
    from_fn(move || Ok(value.clone()))
}

/// A task whose body is a side effect with no result.
pub fn run<F>(block: F) -> TaskHandle<BlockTask<(), impl Fn() -> TaskResult<()> + Send + Sync + 'static>>
where
    F: Fn() + Send + Sync + 'static,
{
    from_fn(move || {
        block();
        Ok(())
    })
}
