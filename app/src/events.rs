//! FILENAME: app/src/events.rs
// PURPOSE: Change notifications for grid state subscribers.
// CONTEXT: Listeners run synchronously on the thread that changed the state,
// after the state lock is released. A listener may subscribe or unsubscribe
// from inside its callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use engine::RowId;

/// What changed.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// Rows and fields were replaced by a fetch.
    RowsReplaced { rows: usize },
    /// One row changed locally (optimistic write, server row or rollback).
    RowUpdated { row_id: RowId },
    /// A batch finished; `applied` cells changed.
    BatchApplied { applied: usize, failed: usize },
    SearchChanged { query: String },
    GroupingChanged,
    CollapseChanged,
    LabelsResolved { field: String, count: usize },
    LayoutChanged,
    /// A cell started or finished saving.
    SavingChanged { row_id: RowId, field: String, saving: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&GridEvent) + Send + Sync>;

#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|(lid, _)| *lid != id);
                listeners.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &GridEvent) {
        let snapshot: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(event);
        }
    }
}
