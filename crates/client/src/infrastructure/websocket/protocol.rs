//! Wire format of the event stream.
//!
//! Frames are JSON text messages of the form
//! `{"event": "<category>", "data": {"title", "content", "navigation": {"path", "query"}}}`.

use std::collections::BTreeMap;

use campuslive_domain::{DomainEvent, EventCategory, NavigationTarget};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct WireFrame {
    event: String,
    #[serde(default)]
    data: Option<WirePayload>,
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    navigation: Option<WireNavigation>,
}

#[derive(Debug, Deserialize)]
struct WireNavigation {
    path: String,
    #[serde(default)]
    query: serde_json::Map<String, Value>,
}

impl From<WireNavigation> for NavigationTarget {
    fn from(wire: WireNavigation) -> Self {
        // Servers send ids as numbers or strings; the router only takes strings.
        let query: BTreeMap<String, String> = wire
            .query
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();
        NavigationTarget {
            path: wire.path,
            query,
        }
    }
}

/// Result of decoding one text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFrame {
    Event(DomainEvent),
    /// Well-formed frame for an event this client does not handle
    Ignored { event: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Missing payload for '{0}' event")]
    MissingPayload(String),
}

pub fn parse_frame(text: &str) -> Result<ParsedFrame, FrameError> {
    let frame: WireFrame = serde_json::from_str(text)?;
    let Ok(category) = frame.event.parse::<EventCategory>() else {
        return Ok(ParsedFrame::Ignored { event: frame.event });
    };
    let payload = frame
        .data
        .ok_or_else(|| FrameError::MissingPayload(frame.event.clone()))?;

    Ok(ParsedFrame::Event(DomainEvent {
        category,
        title: payload.title,
        content: payload.content,
        navigation_target: payload.navigation.map(NavigationTarget::from),
    }))
}
