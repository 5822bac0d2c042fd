use crate::provider::lock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle identifying a registered change observer, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = Arc<dyn Fn() + Send + Sync>;

/// Per-provider list of change observers.
///
/// Notification runs inside the provider's refresh gate, after the snapshot
/// swap, so callbacks for one provider are never invoked concurrently with
/// each other and always observe the refreshed document.
pub(crate) struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, ObserverFn)>>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, observer: impl Fn() + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, Arc::new(observer)));
        id
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub(crate) fn notify(&self) {
        // Clone the callbacks out so a callback registering or removing
        // observers does not deadlock on the registry lock.
        let callbacks: Vec<ObserverFn> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &lock(&self.observers).len())
            .finish()
    }
}
