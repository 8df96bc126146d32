//! Topic subscription registry.
//!
//! Handlers are keyed by topic and by a per-registration id, so the same
//! closure registered twice is two independent subscriptions and removing
//! one leaves the other in place. A topic disappears once its last handler
//! is removed.
//!
//! Dispatch snapshots the handler list and releases the lock before calling
//! anything, so handlers may subscribe or unsubscribe re-entrantly. A handler
//! that panics is logged and skipped; the remaining handlers still run.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{error, trace};

/// Topic that receives every parsed inbound frame.
pub const DEFAULT_TOPIC: &str = "";

/// A subscriber callback.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type HandlerMap = HashMap<u64, MessageHandler>;

/// Outcome of one [`SubscriptionRegistry::dispatch`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned normally.
    pub delivered: usize,
    /// Handlers that panicked.
    pub panicked: usize,
}

/// Topic → handlers.
#[derive(Default)]
pub struct SubscriptionRegistry {
    topics: RwLock<HashMap<String, HandlerMap>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Empty registry, ready to be shared.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` under `topic`.
    pub fn subscribe(
        self: &Arc<Self>,
        topic: impl Into<String>,
        handler: MessageHandler,
    ) -> Subscription {
        let topic = topic.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .topics
            .write()
            .entry(topic.clone())
            .or_default()
            .insert(id, handler);
        trace!(topic = %topic, id, "handler subscribed");
        Subscription {
            registry: Arc::downgrade(self),
            topic,
            id,
        }
    }

    fn remove(&self, topic: &str, id: u64) -> bool {
        let mut topics = self.topics.write();
        let Some(handlers) = topics.get_mut(topic) else {
            return false;
        };
        let removed = handlers.remove(&id).is_some();
        if handlers.is_empty() {
            let _ = topics.remove(topic);
        }
        removed
    }

    /// Snapshot of the handlers currently registered under `topic`.
    pub fn handlers(&self, topic: &str) -> Vec<MessageHandler> {
        self.topics
            .read()
            .get(topic)
            .map(|handlers| handlers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of handlers under `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, HashMap::len)
    }

    /// Number of topics with at least one handler.
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    /// Drop every handler.
    pub fn clear(&self) {
        self.topics.write().clear();
    }

    /// Deliver `message` to every handler of `topic`.
    pub fn dispatch(&self, topic: &str, message: &Value) -> DispatchReport {
        let mut report = DispatchReport::default();
        for handler in self.handlers(topic) {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.panicked += 1;
                    error!(
                        topic = %topic,
                        panic = %panic_message(panic.as_ref()),
                        "message handler panicked"
                    );
                }
            }
        }
        report
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = self.topics.read();
        let mut counts: Vec<(&str, usize)> =
            topics.iter().map(|(t, h)| (t.as_str(), h.len())).collect();
        counts.sort_unstable();
        f.debug_struct("SubscriptionRegistry")
            .field("topics", &counts)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle to one registration. Dropping it leaves the handler registered;
/// call [`unsubscribe`](Self::unsubscribe) or convert it into a
/// [`SubscriptionGuard`] for scope-bound release.
#[must_use = "dropping a Subscription does not unsubscribe; call unsubscribe() or into_guard()"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<SubscriptionRegistry>,
    topic: String,
    id: u64,
}

impl Subscription {
    /// Topic this registration listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove exactly this registration. Returns false if it was already gone
    /// (registry cleared or dropped).
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(&self.topic, self.id))
    }

    /// Tie this registration to a guard that unsubscribes on drop.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { inner: Some(self) }
    }
}

/// Unsubscribes when dropped.
#[must_use = "the handler is removed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    inner: Option<Subscription>,
}

impl SubscriptionGuard {
    /// Topic this guard's registration listens on.
    pub fn topic(&self) -> &str {
        self.inner.as_ref().map_or("", Subscription::topic)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(sub) = self.inner.take() {
            let _ = sub.unsubscribe();
        }
    }
}
