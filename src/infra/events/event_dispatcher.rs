// In-process implementation of the EventBus port. The gateway adapter
// publishes occurrences into it; subscriptions come from the descriptor
// catalog at startup.

use crate::core::events::{BusEvent, EventBus, SubscriptionHandle};
use crate::core::registry::EventDescriptor;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

struct Subscription {
    handle: SubscriptionHandle,
    descriptor: EventDescriptor,
}

/// Dispatcher keyed by event name: at most one active subscription per
/// name, `once` subscriptions removed before their single delivery.
pub struct EventDispatcher {
    subscriptions: DashMap<String, Subscription>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver one occurrence to its subscriber, if any. Handler failures
    /// are logged, never propagated into the gateway loop.
    pub async fn publish(&self, event: &BusEvent) {
        let name = event.name();

        // Clone the action out instead of holding the map guard across the
        // handler await.
        let (action, once) = match self.subscriptions.get(name) {
            None => return,
            Some(subscription) => (
                subscription.descriptor.action.clone(),
                subscription.descriptor.once,
            ),
        };

        // Removing before the await keeps `once` at-most-once even when
        // occurrences arrive concurrently.
        if once {
            self.subscriptions.remove(name);
        }

        if let Err(err) = action.handle(event).await {
            warn!(event = name, error = %err, "Event handler failed");
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for EventDispatcher {
    fn subscribe(&self, descriptor: EventDescriptor) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let name = descriptor.name.clone();
        if self
            .subscriptions
            .insert(name.clone(), Subscription { handle, descriptor })
            .is_some()
        {
            warn!(event = %name, "Replacing existing event subscription");
        }
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let key = self
            .subscriptions
            .iter()
            .find(|entry| entry.value().handle == handle)
            .map(|entry| entry.key().clone());

        match key {
            Some(key) => self.subscriptions.remove(&key).is_some(),
            None => false,
        }
    }
}
