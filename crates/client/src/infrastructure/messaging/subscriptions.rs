//! Per-category subscription registry.
//!
//! Handlers are registered against an [`EventCategory`] and invoked for every
//! matching event, in registration order. The registry outlives individual
//! connections, so subscriptions survive reconnects and login cycles.

use std::sync::{Arc, Mutex, PoisonError};

use campuslive_domain::{DomainEvent, EventCategory};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type EventHandler = Arc<dyn Fn(DomainEvent) + Send + Sync + 'static>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventCategory, EventHandler)>,
}

#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `category`.
    pub fn subscribe(
        &self,
        category: EventCategory,
        handler: impl Fn(DomainEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.handlers.push((id, category, Arc::new(handler)));
        tracing::debug!(%category, subscription = id.0, "Subscribed");
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.handlers.len();
        inner.handlers.retain(|(existing, _, _)| *existing != id);
        before != inner.handlers.len()
    }

    /// Invoke every handler registered for the event's category.
    ///
    /// Handlers run outside the registry lock, so they may (un)subscribe.
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: DomainEvent) -> usize {
        let targets: Vec<EventHandler> = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner
                .handlers
                .iter()
                .filter(|(_, category, _)| *category == event.category)
                .map(|(_, _, handler)| Arc::clone(handler))
                .collect()
        };

        if targets.is_empty() {
            tracing::debug!(category = %event.category, "No subscribers for event");
        }
        for handler in &targets {
            handler(event.clone());
        }
        targets.len()
    }

    pub fn subscriber_count(&self, category: EventCategory) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .handlers
            .iter()
            .filter(|(_, existing, _)| *existing == category)
            .count()
    }
}
