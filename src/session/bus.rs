//! Status Event Bus
//!
//! Fan-out of [`StatusEvent`]s plus a cached running flag for one-shot
//! status queries. Each subscriber gets its own unbounded queue, so a slow
//! subscriber never stalls the publisher and never loses events.

use log::{debug, error, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use super::events::StatusEvent;

/// Identifies a subscription for `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Subscriber {
    handle: SubscriptionHandle,
    tx: mpsc::UnboundedSender<StatusEvent>,
}

struct BusInner {
    /// Subscribers in subscription order
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    /// Most recent running flag; starts out "not running"
    status: watch::Sender<bool>,
}

/// Shared status bus; clones publish to the same subscribers
#[derive(Clone)]
pub struct StatusEventBus {
    inner: Arc<BusInner>,
}

impl StatusEventBus {
    /// Create a bus with no subscribers and status "not running"
    pub fn new() -> Self {
        let (status, _) = watch::channel(false);
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                status,
            }),
        }
    }

    /// Broadcast an event to every subscriber
    pub fn publish(&self, event: StatusEvent) {
        // Held across the fan-out so concurrent publishers are seen in one order.
        let mut subscribers = self.inner.subscribers.lock();

        if let Some(running) = event.running_status() {
            self.inner.status.send_replace(running);
        }

        subscribers.retain(|subscriber| {
            let delivered = subscriber.tx.send(event.clone()).is_ok();
            if !delivered {
                debug!("Dropping closed subscriber {:?}", subscriber.handle);
            }
            delivered
        });
    }

    /// Subscribe with a queue the caller drains
    pub fn subscribe_channel(&self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<StatusEvent>) {
        let handle = SubscriptionHandle(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(Subscriber { handle, tx });
        (handle, rx)
    }

    /// Subscribe with a handler.
    ///
    /// The handler runs on a task of the current Tokio runtime, or on its own
    /// thread when called from outside one.
    pub fn subscribe<F>(&self, mut handler: F) -> SubscriptionHandle
    where
        F: FnMut(&StatusEvent) + Send + 'static,
    {
        let (handle, mut rx) = self.subscribe_channel();

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    while let Some(event) = rx.recv().await {
                        handler(&event);
                    }
                    debug!("Subscription {:?} closed", handle);
                });
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name("status-subscriber".to_string())
                    .spawn(move || {
                        while let Some(event) = rx.blocking_recv() {
                            handler(&event);
                        }
                        debug!("Subscription {:?} closed", handle);
                    });
                if let Err(e) = spawned {
                    error!("Failed to spawn subscriber thread for {:?}: {}", handle, e);
                    self.unsubscribe(handle);
                }
            }
        }

        handle
    }

    /// Remove a subscription. Events already queued are still delivered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.handle != handle);
        let removed = subscribers.len() != before;
        if !removed {
            warn!("Unsubscribe for unknown subscription {:?}", handle);
        }
        removed
    }

    /// Whether the proxy is running, per the latest published event
    pub fn query_current_status(&self) -> bool {
        *self.inner.status.borrow()
    }

    /// Follow the running flag as it changes
    pub fn watch_status(&self) -> watch::Receiver<bool> {
        self.inner.status.subscribe()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl Default for StatusEventBus {
    fn default() -> Self {
        Self::new()
    }
}
