//! Implements ReachabilityPort with a signal the host drives by hand.
//!
//! Hosts wire their platform's online/offline events into `set_online`; tests use it
//! to simulate transitions.

use crate::ports::{ListenerId, ReachabilityListener, ReachabilityPort};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub struct ManualReachability {
    online: AtomicBool,
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, ReachabilityListener>>,
}

impl ManualReachability {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(BTreeMap::new()),
        }
    }

    /// Raise the platform signal. Listeners run synchronously, outside the registry lock.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        let listeners: Vec<ReachabilityListener> =
            self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(online);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl ReachabilityPort for ManualReachability {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn attach(&self, listener: ReachabilityListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().insert(id, listener);
        ListenerId(id)
    }

    fn detach(&self, id: ListenerId) {
        self.listeners.lock().remove(&id.0);
    }
}
