use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::core::domain::{CompletionEvent, EventKind, TransferResult};

/// Callback invoked with the result of every completed session of one kind
pub type Listener = Arc<dyn Fn(&TransferResult) + Send + Sync>;

/// Handle returned by [`EventDispatcher::subscribe`]; unsubscribing a single
/// registration goes through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out point for completion events.
///
/// Listeners are stored per event kind in registration order, which is also
/// their delivery order within one event. Across events, delivery follows the
/// order `emit` is called, i.e. session-completion order. The registration
/// table is the only shared state and the dispatcher owns it exclusively.
pub struct EventDispatcher {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for one event kind. Multiple callbacks may be
    /// registered for the same kind; each fires once per matching event.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&TransferResult) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut table = self.listeners.lock().unwrap();
        table
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        debug!(kind = %kind, listener = id.0, "listener registered");
        id
    }

    /// Remove one registration by id, or every registration for the kind when
    /// `id` is `None`. Removing an unknown id is a no-op.
    pub fn unsubscribe(&self, kind: EventKind, id: Option<ListenerId>) {
        let mut table = self.listeners.lock().unwrap();
        match id {
            Some(id) => {
                if let Some(entries) = table.get_mut(&kind) {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }
            None => {
                table.remove(&kind);
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        let table = self.listeners.lock().unwrap();
        table.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver one event to every listener of its kind, in registration
    /// order. Snapshot the Arcs first so callbacks never run under the table
    /// lock and may re-enter subscribe/unsubscribe. A panicking callback is
    /// caught and logged; the remaining listeners still fire.
    pub fn emit(&self, event: &CompletionEvent) {
        let snapshot: Vec<Listener> = {
            let table = self.listeners.lock().unwrap();
            table
                .get(&event.kind)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        debug!(
            kind = %event.kind,
            err_code = event.result.err_code,
            listeners = snapshot.len(),
            "delivering completion event"
        );

        for listener in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&event.result)));
            if outcome.is_err() {
                error!(kind = %event.kind, "listener panicked during event delivery");
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
