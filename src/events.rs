//! Process-wide lifecycle notifications.
//!
//! Every task posts an event as it is about to start, has started, is about to finish and
//! has finished. Each event carries the task's identity and the name of the queue whose
//! worker is running it, when there is one.
//!
//! ```
//! use taskchain::events::{self, EventKind};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let _subscription = events::subscribe(move |event| {
//!     sink.lock().unwrap().push(event.kind);
//! });
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::queue::Queue;
use crate::task::Task;
use crate::types::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WillStart,
    DidStart,
    WillFinish,
    DidFinish,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::WillStart => "will start",
            EventKind::DidStart => "did start",
            EventKind::WillFinish => "will finish",
            EventKind::DidFinish => "did finish",
        };
        f.write_str(s)
    }
}

/// A lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub task_id: TaskId,
    pub task_name: Option<String>,
    /// The queue whose worker posted the event, if any.
    pub queue_name: Option<String>,
}

type Handler = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

static HANDLERS: RwLock<Vec<(u64, Handler)>> = const_rwlock(Vec::new());
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(0);

/// Keeps a handler registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its handler"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        HANDLERS.write().retain(|(id, _)| *id != self.id);
    }
}

/// Register `handler` for every lifecycle event of every task in the process.
///
/// Handlers run synchronously on the thread driving the task, so they should be quick.
pub fn subscribe(handler: impl Fn(&LifecycleEvent) + Send + Sync + 'static) -> Subscription {
    let id = NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed);
    HANDLERS.write().push((id, Arc::new(handler)));
    Subscription { id }
}

pub(crate) fn post(kind: EventKind, task: &Task) {
    let queue_name = Queue::current_name();

    #[cfg(feature = "tracing")]
    debug!(
        task_id = task.id().0,
        task_name = task.name().as_deref().unwrap_or("unnamed"),
        queue = queue_name.as_deref().unwrap_or("none"),
        "task {kind}"
    );

    let handlers: Vec<Handler> = {
        let registered = HANDLERS.read();
        if registered.is_empty() {
            return;
        }
        registered.iter().map(|(_, h)| Arc::clone(h)).collect()
    };

    let event = LifecycleEvent {
        kind,
        task_id: task.id(),
        task_name: task.name(),
        queue_name,
    };
    for handler in handlers {
        handler(&event);
    }
}
