//! In-app banner items.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_event::{DomainEvent, EventCategory};
use crate::ids::BannerId;
use crate::navigation::NavigationTarget;

/// A transient in-app notification shown while the app is foregrounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerItem {
    pub id: BannerId,
    pub title: String,
    pub message: String,
    pub category: EventCategory,
    pub navigation_target: Option<NavigationTarget>,
    pub created_at: DateTime<Utc>,
    pub auto_dismiss_deadline: DateTime<Utc>,
}

impl BannerItem {
    /// Build a banner for `event`, due to auto-dismiss `display_for` after `now`.
    ///
    /// A deadline past the representable range saturates at the latest instant.
    pub fn from_event(event: &DomainEvent, now: DateTime<Utc>, display_for: Duration) -> Self {
        Self {
            id: BannerId::new(),
            title: event.title.clone(),
            message: event.content.clone(),
            category: event.category,
            navigation_target: event.navigation_target.clone(),
            created_at: now,
            auto_dismiss_deadline: now
                .checked_add_signed(display_for)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Which of the three removal paths took a banner off screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DismissReason {
    /// Auto-dismiss timer expired
    Timeout,
    /// User closed it explicitly
    Closed,
    /// User tapped it (navigation, if any, already happened)
    Tapped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_event_copies_fields_and_sets_deadline() {
        let now = Utc::now();
        let event = DomainEvent::new(EventCategory::NewParticipant, "Hiking club", "Ana joined")
            .with_target(NavigationTarget::new("ActivityDetail").with_param("id", "7"));

        let item = BannerItem::from_event(&event, now, Duration::milliseconds(4000));

        assert_eq!(item.title, "Hiking club");
        assert_eq!(item.message, "Ana joined");
        assert_eq!(item.category, EventCategory::NewParticipant);
        assert_eq!(item.navigation_target, event.navigation_target);
        assert_eq!(item.auto_dismiss_deadline - item.created_at, Duration::seconds(4));
    }

    #[test]
    fn deadline_saturates_instead_of_overflowing() {
        let event = DomainEvent::new(EventCategory::Message, "Lin", "hi");

        let item = BannerItem::from_event(&event, Utc::now(), Duration::MAX);

        assert_eq!(item.auto_dismiss_deadline, DateTime::<Utc>::MAX_UTC);
    }
}
