//! Observer registry for claim/release/unavailable notifications.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{EventKind, PortEvent};

type Listener = Arc<dyn Fn(&PortEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscription {
    id: SubscriptionId,
    /// `None` receives every kind.
    kind: Option<EventKind>,
    listener: Listener,
}

/// Fan-out of registry events to subscribed listeners.
///
/// Listeners run synchronously on the emitting task, in subscription order,
/// and without any lock held, so they may call back into the registry.
#[derive(Default)]
pub struct Notifier {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PortEvent) + Send + Sync + 'static,
    {
        self.add(Some(kind), Arc::new(listener))
    }

    /// Subscribe to every event.
    pub fn subscribe_all<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PortEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(listener))
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    /// Deliver an event to every matching listener.
    pub fn emit(&self, event: &PortEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| Arc::clone(&s.listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    fn add(&self, kind: Option<EventKind>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.subscriptions.write().push(Subscription { id, kind, listener });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Claim;
    use parking_lot::Mutex;

    fn claim_event() -> PortEvent {
        PortEvent::Claim(Claim::new("http", 4201, None))
    }

    #[test]
    fn test_kind_filter() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        notifier.subscribe(EventKind::Release, move |e| sink.lock().push(e.kind()));
        let sink = Arc::clone(&seen);
        notifier.subscribe_all(move |e| sink.lock().push(e.kind()));

        notifier.emit(&claim_event());
        assert_eq!(*seen.lock(), vec![EventKind::Claim]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = Notifier::new();
        let count = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&count);
        let id = notifier.subscribe(EventKind::Claim, move |_| *sink.lock() += 1);
        notifier.emit(&claim_event());

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.emit(&claim_event());

        assert_eq!(*count.lock(), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let notifier = Arc::new(Notifier::new());
        let inner = Arc::downgrade(&notifier);
        notifier.subscribe_all(move |_| {
            if let Some(n) = inner.upgrade() {
                n.subscribe_all(|_| {});
            }
        });

        notifier.emit(&claim_event());
        assert_eq!(notifier.len(), 2);
    }
}
