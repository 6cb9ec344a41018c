//! Banner Queue - transient in-app notifications.
//!
//! Items render top-to-bottom in arrival order. Each item owns an auto-dismiss
//! timer started at enqueue time. Removal happens through exactly one of
//! timeout, explicit close or tap: whichever claims the item first under the
//! queue lock wins, the others find the id absent and do nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use campuslive_domain::{BannerId, BannerItem, DismissReason, DomainEvent};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::ports::outbound::NavigatorPort;

pub const DEFAULT_BANNER_DURATION: Duration = Duration::from_millis(4_000);

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Change feed for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerEvent {
    Shown(BannerItem),
    Removed { id: BannerId, reason: DismissReason },
}

/// Auto-dismiss timer; aborted when the entry is removed or the queue dropped.
struct DismissTimer(AbortHandle);

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Entry {
    item: BannerItem,
    _timer: DismissTimer,
}

struct Shared {
    entries: Mutex<Vec<Entry>>,
    events: broadcast::Sender<BannerEvent>,
    display_for: Duration,
    navigator: Arc<dyn NavigatorPort>,
}

#[derive(Clone)]
pub struct BannerQueue {
    shared: Arc<Shared>,
}

impl BannerQueue {
    pub fn new(navigator: Arc<dyn NavigatorPort>, display_for: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(Vec::new()),
                events,
                display_for,
                navigator,
            }),
        }
    }

    /// Build a banner from `event` and enqueue it.
    pub fn enqueue_event(&self, event: &DomainEvent) -> BannerId {
        let display_for =
            chrono::Duration::from_std(self.shared.display_for).unwrap_or(chrono::TimeDelta::MAX);
        self.enqueue(BannerItem::from_event(event, chrono::Utc::now(), display_for))
    }

    /// Append `item` to the tail and start its auto-dismiss timer.
    pub fn enqueue(&self, item: BannerItem) -> BannerId {
        let id = item.id;
        let category = item.category;

        // The timer is started under the lock so it can only ever see the
        // entry after it has been pushed.
        let mut entries = self.shared.lock_entries();
        entries.push(Entry {
            item: item.clone(),
            _timer: self.spawn_timer(id),
        });
        let _ = self.shared.events.send(BannerEvent::Shown(item));
        drop(entries);

        tracing::debug!(banner_id = %id, %category, "Banner shown");
        id
    }

    /// Explicit close. Returns false if the item was already gone.
    pub fn dismiss(&self, id: BannerId) -> bool {
        self.shared.remove(id, DismissReason::Closed).is_some()
    }

    /// Tap: navigate to the item's target (if any), then remove it.
    ///
    /// Returns false, without navigating, if the item was already gone.
    pub fn on_tap(&self, id: BannerId) -> bool {
        let Some(item) = self.shared.take(id) else {
            tracing::debug!(banner_id = %id, "Tap on removed banner ignored");
            return false;
        };
        if let Some(target) = &item.navigation_target {
            tracing::info!(banner_id = %id, path = %target.path, "Navigating from banner");
            self.shared.navigator.navigate(target);
        }
        self.shared.announce_removed(id, DismissReason::Tapped);
        true
    }

    /// Items in display order (oldest first).
    pub fn snapshot(&self) -> Vec<BannerItem> {
        self.shared
            .lock_entries()
            .iter()
            .map(|entry| entry.item.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: BannerId) -> bool {
        self.shared
            .lock_entries()
            .iter()
            .any(|entry| entry.item.id == id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BannerEvent> {
        self.shared.events.subscribe()
    }

    fn spawn_timer(&self, id: BannerId) -> DismissTimer {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let display_for = self.shared.display_for;
        let task = tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            if let Some(shared) = shared.upgrade() {
                shared.remove(id, DismissReason::Timeout);
            }
        });
        DismissTimer(task.abort_handle())
    }
}

impl Shared {
    fn lock_entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the item; at most one caller ever gets `Some` for a given id.
    fn take(&self, id: BannerId) -> Option<BannerItem> {
        let entry = {
            let mut entries = self.lock_entries();
            let index = entries.iter().position(|entry| entry.item.id == id)?;
            entries.remove(index)
        };
        // Entry (and its timer guard) dropped outside the lock.
        Some(entry.item.clone())
    }

    fn remove(&self, id: BannerId, reason: DismissReason) -> Option<BannerItem> {
        let item = self.take(id)?;
        self.announce_removed(id, reason);
        Some(item)
    }

    fn announce_removed(&self, id: BannerId, reason: DismissReason) {
        tracing::debug!(banner_id = %id, ?reason, "Banner removed");
        let _ = self.events.send(BannerEvent::Removed { id, reason });
    }
}
