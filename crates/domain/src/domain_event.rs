//! Server-originated occurrences that need user-facing notice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::navigation::NavigationTarget;

/// The four kinds of real-time events the client reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    /// New chat message
    Message,
    /// The user's participation in an activity was approved/rejected/changed
    ParticipationStatusChanged,
    /// Someone joined an activity the user organizes
    NewParticipant,
    /// Someone checked in at an activity the user organizes
    NewCheckin,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Message,
        EventCategory::ParticipationStatusChanged,
        EventCategory::NewParticipant,
        EventCategory::NewCheckin,
    ];

    /// Event name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Message => "message",
            EventCategory::ParticipationStatusChanged => "participationStatusChanged",
            EventCategory::NewParticipant => "newParticipant",
            EventCategory::NewCheckin => "newCheckin",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| DomainError::parse(format!("Unknown event category: {}", s)))
    }
}

/// A single inbound event, immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    pub category: EventCategory,
    pub title: String,
    pub content: String,
    pub navigation_target: Option<NavigationTarget>,
}

impl DomainEvent {
    pub fn new(
        category: EventCategory,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            category,
            title: title.into(),
            content: content.into(),
            navigation_target: None,
        }
    }

    pub fn with_target(mut self, target: NavigationTarget) -> Self {
        self.navigation_target = Some(target);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_parse_back() {
        for category in EventCategory::ALL {
            assert_eq!(category.as_str().parse::<EventCategory>(), Ok(category));
        }
    }

    #[test]
    fn unknown_wire_name_is_parse_error() {
        let err = "typing".parse::<EventCategory>().expect_err("should not parse");
        assert!(matches!(err, DomainError::Parse(_)));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&EventCategory::NewCheckin).expect("serialize");
        assert_eq!(json, r#""newCheckin""#);
    }
}
