//! Weighted, composable progress counters.
//!
//! Every task owns a [`Progress`] of one unit which is completed when the task finishes.
//! Aggregates are built by adding other counters as children, each standing in for a
//! number of the parent's units. Because children can themselves be aggregates, progress
//! composes across arbitrarily nested groups.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::task::Task;

/// A shared progress counter.
///
/// Cloning yields another handle to the same counter.
///
/// The completed fraction is `(completed + Σ child.fraction × weight) / total`, clamped to
/// `[0.0, 1.0]`. A counter with zero total units reports `0.0`, unless it has children and
/// all of them are finished.
///
/// ```
/// use taskchain::Progress;
///
/// let parent = Progress::new(3);
/// let small = Progress::new(1);
/// let large = Progress::new(10);
/// parent.add_child(small.clone(), 1);
/// parent.add_child(large.clone(), 2);
///
/// small.complete();
/// large.set_completed_units(5);
/// assert!((parent.fraction_completed() - 2.0 / 3.0).abs() < 1e-9);
///
/// large.complete();
/// assert_eq!(parent.fraction_completed(), 1.0);
/// ```
#[derive(Clone)]
pub struct Progress {
    inner: Arc<RwLock<Counts>>,
}

struct Counts {
    total: u64,
    completed: u64,
    children: Vec<Child>,
}

struct Child {
    progress: Progress,
    weight: u64,
}

impl Progress {
    pub fn new(total_units: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Counts {
                total: total_units,
                completed: 0,
                children: Vec::new(),
            })),
        }
    }

    pub fn total_units(&self) -> u64 {
        self.inner.read().total
    }

    pub fn set_total_units(&self, total_units: u64) {
        self.inner.write().total = total_units;
    }

    /// Completed units, counting a child's weight once that child is fully complete.
    pub fn completed_units(&self) -> u64 {
        let counts = self.inner.read();
        let from_children: u64 = counts
            .children
            .iter()
            .filter(|child| child.progress.is_finished())
            .map(|child| child.weight)
            .sum();
        counts.completed.saturating_add(from_children).min(counts.total)
    }

    /// Set this counter's own completed units. Values above the total are clamped.
    pub fn set_completed_units(&self, completed_units: u64) {
        let mut counts = self.inner.write();
        counts.completed = completed_units.min(counts.total);
    }

    /// Mark every unit of this counter as completed.
    pub fn complete(&self) {
        let mut counts = self.inner.write();
        counts.completed = counts.total;
    }

    /// Add `child` as standing in for `weight` of this counter's units.
    ///
    /// The caller is responsible for `total_units` accounting for the weight.
    pub fn add_child(&self, child: Progress, weight: u64) {
        self.inner.write().children.push(Child {
            progress: child,
            weight,
        });
    }

    pub fn child_count(&self) -> usize {
        self.inner.read().children.len()
    }

    pub fn fraction_completed(&self) -> f64 {
        let counts = self.inner.read();
        if counts.total == 0 {
            // Only weightless children: done once they all are.
            let done = !counts.children.is_empty()
                && counts.children.iter().all(|child| child.progress.is_finished());
            return if done { 1.0 } else { 0.0 };
        }

        let mut done = counts.completed as f64;
        for child in &counts.children {
            done += child.progress.fraction_completed() * child.weight as f64;
        }

        (done / counts.total as f64).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.fraction_completed() >= 1.0
    }

    /// Build a parent whose children are the given tasks' counters, each weighted by
    /// that task's estimated work. The total is the sum of the weights.
    pub(crate) fn weighted<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Progress {
        let parent = Progress::new(0);
        let mut total = 0u64;
        for task in tasks {
            let weight = task.estimated_work();
            total += weight;
            parent.add_child(task.progress(), weight);
        }
        parent.set_total_units(total);
        parent
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("completed_units", &self.completed_units())
            .field("total_units", &self.total_units())
            .field("fraction_completed", &self.fraction_completed())
            .finish()
    }
}

/// Aggregate progress over `task`'s whole chain, weighted by each member's estimated work.
///
/// Build this after the graph is fully wired and after any group has been created, since
/// it snapshots which counters belong to the chain.
pub fn chain_progress(task: &Task) -> Progress {
    let chain = task.chain();
    Progress::weighted(chain.iter())
}
