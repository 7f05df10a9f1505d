//! Lifecycle notifications are available regardless of the tracing feature

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskchain::block;
use taskchain::events::{self, EventKind};

use crate::common::{drain, queue};

#[test]
fn test_events_without_subscriber() {
    let task = block::value(1);
    let id = task.id();
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = finished.clone();
    let _subscription = events::subscribe(move |event| {
        if event.task_id == id && event.kind == EventKind::DidFinish {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let queue = queue();
    task.submit(&queue);
    drain(&queue);

    assert_eq!(finished.load(Ordering::SeqCst), 1);
}
