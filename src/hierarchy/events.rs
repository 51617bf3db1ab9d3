//! Change notifications relayed by a lifecycle to its consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::base::TypeId;

/// What a lifecycle listener is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyEvent {
    /// The whole hierarchy may be out of date.
    Full,
    /// Only these types (all contained in the snapshot) may render differently.
    TypesChanged(Vec<TypeId>),
}

/// Callback registered with a lifecycle.
pub type ChangeListener = Arc<dyn Fn(&HierarchyEvent) + Send + Sync>;

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered listener list.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Mutex<Vec<(ListenerId, ChangeListener)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.entries.lock().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(lid, _)| *lid != id);
        entries.len() != before
    }

    /// Call every listener. The list is copied first so listeners may
    /// register or remove listeners while being notified.
    pub(crate) fn fire(&self, event: &HierarchyEvent) {
        let listeners: Vec<ChangeListener> =
            self.entries.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
