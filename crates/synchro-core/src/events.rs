//! Cross-cutting event bus (C12).
//!
//! Nodes and the graph manager publish lifecycle/diagnostic events
//! (`node.started`, `node.error`, `vad.speech`, `connector.state`, ...) without
//! knowing who, if anyone, is listening. Delivery is synchronous and
//! best-effort: a panicking subscriber is caught and logged, never allowed to
//! take down the publisher or other subscribers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// An event published on the bus: a dotted type tag, originating node,
/// optional run correlation id, and a free-form payload.
#[derive(Debug, Clone)]
pub struct Event {
    /// Dotted event type, e.g. `"node.started"`, `"connector.state"`.
    pub kind: String,
    /// Name of the node that published this event.
    pub node_name: String,
    /// Correlation id of the graph run this event belongs to, if any.
    pub run_id: Option<String>,
    /// Wall-clock time the event was published.
    pub timestamp: SystemTime,
    /// Human-readable/structured payload. Kept as a string to avoid forcing
    /// a shared payload schema on every subscriber.
    pub payload: String,
}

impl Event {
    /// Builds an event stamped with the current time, with no run id.
    pub fn new(node_name: impl Into<String>, kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            node_name: node_name.into(),
            run_id: None,
            timestamp: SystemTime::now(),
            payload: payload.into(),
        }
    }

    /// Attaches a run correlation id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// True if `kind` looks like an error-class event (ends in or contains
    /// `.error`), used to pick the `tracing` level on publish.
    fn is_error_like(&self) -> bool {
        self.kind.contains("error") || self.kind.contains("failed")
    }
}

type Subscriber = dyn Fn(&Event) + Send + Sync;

struct Subscription {
    /// Exact kind to match, or `None` for a wildcard (`"*"`) subscription.
    kind: Option<String>,
    callback: Arc<Subscriber>,
}

/// Thread-safe fan-out publisher. Cheap to clone; clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl EventBus {
    /// Builds an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every event of the given `kind`.
    pub fn subscribe(&self, kind: impl Into<String>, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscriptions.lock().unwrap().push(Subscription {
            kind: Some(kind.into()),
            callback: Arc::new(callback),
        });
    }

    /// Subscribes to every event regardless of kind.
    pub fn subscribe_all(&self, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.subscriptions.lock().unwrap().push(Subscription {
            kind: None,
            callback: Arc::new(callback),
        });
    }

    /// Publishes `event` to every matching subscriber, synchronously, in
    /// subscription order. Also emits a `tracing` event at debug level so the
    /// bus is visible in logs even with zero subscribers.
    pub fn publish(&self, event: Event) {
        if event.is_error_like() {
            tracing::warn!(kind = %event.kind, node = %event.node_name, payload = %event.payload, "event published");
        } else {
            tracing::debug!(kind = %event.kind, node = %event.node_name, payload = %event.payload, "event published");
        }

        let subs = self.subscriptions.lock().unwrap();
        for sub in subs.iter() {
            let matches = match &sub.kind {
                Some(k) => *k == event.kind,
                None => true,
            };
            if !matches {
                continue;
            }
            let callback = Arc::clone(&sub.callback);
            let event_ref = &event;
            let result = panic::catch_unwind(AssertUnwindSafe(|| callback(event_ref)));
            if result.is_err() {
                tracing::error!(kind = %event.kind, "event subscriber panicked");
            }
        }
    }

    /// Number of currently-registered subscriptions (exact + wildcard).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn exact_kind_subscriber_only_sees_matching_events() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        bus.subscribe("node.started", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Event::new("input", "node.started", "input"));
        bus.publish(Event::new("input", "node.stopped", "input"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wildcard_subscriber_sees_everything() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        bus.subscribe_all(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Event::new("input", "node.started", "input"));
        bus.publish(Event::new("connector", "connector.state", "ready"));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_others() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(|_| panic!("boom"));
        let hits_clone = Arc::clone(&hits);
        bus.subscribe_all(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Event::new("mixer", "node.error", "oops"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
