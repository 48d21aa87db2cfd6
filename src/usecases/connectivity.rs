//! Connectivity monitor. Single source of truth for "are we offline".
//!
//! One platform listener is shared by every consumer: it is attached when the first
//! subscription is taken and detached when the last one is dropped. Duplicate platform
//! signals are ignored, so each consumer hears exactly once per real transition.

use crate::ports::{ConnectivityNotice, ListenerId, NotifierPort, ReachabilityPort};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};

type Callback = Arc<dyn Fn() + Send + Sync>;

/// What a consumer wants to hear about.
#[derive(Clone)]
pub struct ConnectivityCallbacks {
    on_offline: Option<Callback>,
    on_online: Option<Callback>,
    show_notifications: bool,
}

impl Default for ConnectivityCallbacks {
    fn default() -> Self {
        Self {
            on_offline: None,
            on_online: None,
            show_notifications: true,
        }
    }
}

impl ConnectivityCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_offline(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_offline = Some(Arc::new(f));
        self
    }

    pub fn on_online(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_online = Some(Arc::new(f));
        self
    }

    /// Toast on transitions. On by default.
    pub fn notifications(mut self, enabled: bool) -> Self {
        self.show_notifications = enabled;
        self
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    consumers: BTreeMap<u64, ConnectivityCallbacks>,
    platform_listener: Option<ListenerId>,
}

struct Inner {
    platform: Arc<dyn ReachabilityPort>,
    notifier: Option<Arc<dyn NotifierPort>>,
    /// `true` while offline.
    offline: watch::Sender<bool>,
    registry: Mutex<Registry>,
}

impl Inner {
    fn transition(&self, online: bool) {
        let offline = !online;
        let changed = self.offline.send_if_modified(|current| {
            if *current == offline {
                false
            } else {
                *current = offline;
                true
            }
        });
        if !changed {
            debug!(online, "duplicate reachability signal ignored");
            return;
        }

        let (callbacks, notify): (Vec<Callback>, bool) = {
            let registry = self.registry.lock();
            let callbacks = registry
                .consumers
                .values()
                .filter_map(|c| {
                    if offline {
                        c.on_offline.clone()
                    } else {
                        c.on_online.clone()
                    }
                })
                .collect();
            let notify = registry.consumers.values().any(|c| c.show_notifications);
            (callbacks, notify)
        };

        if offline {
            warn!("connectivity lost");
        } else {
            info!("connectivity restored");
        }
        for callback in callbacks {
            callback();
        }
        if notify {
            if let Some(notifier) = &self.notifier {
                notifier.notify(if offline {
                    ConnectivityNotice::WentOffline
                } else {
                    ConnectivityNotice::BackOnline
                });
            }
        }
    }

    fn unsubscribe(&self, id: u64) {
        let detach = {
            let mut registry = self.registry.lock();
            registry.consumers.remove(&id);
            if registry.consumers.is_empty() {
                registry.platform_listener.take()
            } else {
                None
            }
        };
        if let Some(listener) = detach {
            self.platform.detach(listener);
            debug!("last consumer left; platform listener detached");
        }
    }
}

/// Cloneable handle; all clones share one state and one platform subscription.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Seeds the state from the platform's current reachability.
    pub fn new(
        platform: Arc<dyn ReachabilityPort>,
        notifier: Option<Arc<dyn NotifierPort>>,
    ) -> Self {
        let (offline, _) = watch::channel(!platform.is_online());
        Self {
            inner: Arc::new(Inner {
                platform,
                notifier,
                offline,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    pub fn is_offline(&self) -> bool {
        *self.inner.offline.borrow()
    }

    pub fn is_online(&self) -> bool {
        !self.is_offline()
    }

    /// Receiver that yields `true` while offline; for async consumers.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.inner.offline.subscribe()
    }

    pub fn consumer_count(&self) -> usize {
        self.inner.registry.lock().consumers.len()
    }

    /// Attach a consumer. The platform listener is attached on the first subscription.
    pub fn subscribe(&self, callbacks: ConnectivityCallbacks) -> Subscription {
        let (id, attach) = {
            let mut registry = self.inner.registry.lock();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.consumers.insert(id, callbacks);
            (id, registry.platform_listener.is_none())
        };

        if attach {
            // The signal may have moved while nobody listened; resync without notifying.
            let offline = !self.inner.platform.is_online();
            self.inner.offline.send_if_modified(|current| {
                let changed = *current != offline;
                *current = offline;
                changed
            });

            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            let listener = self.inner.platform.attach(Arc::new(move |online: bool| {
                if let Some(inner) = weak.upgrade() {
                    inner.transition(online);
                }
            }));
            let mut registry = self.inner.registry.lock();
            if registry.platform_listener.is_none() && !registry.consumers.is_empty() {
                registry.platform_listener = Some(listener);
            } else {
                drop(registry);
                self.inner.platform.detach(listener);
            }
        }

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }
}

/// Keeps a consumer attached. Dropping it unsubscribes.
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.unsubscribe(self.id);
        }
    }
}
