//! Navigation targets carried by domain events, banners and system notifications.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where the app should go when the user acts on a notification.
///
/// `path` is a route name understood by the navigation layer (e.g. `"Chat"`),
/// `query` its parameters. Both are opaque to the notification pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

impl NavigationTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add one query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_empty_when_absent() {
        let target: NavigationTarget =
            serde_json::from_str(r#"{"path":"ActivityDetail"}"#).expect("valid json");
        assert_eq!(target, NavigationTarget::new("ActivityDetail"));
    }

    #[test]
    fn with_param_builds_query() {
        let target = NavigationTarget::new("Chat").with_param("targetId", "42");
        assert_eq!(target.query.get("targetId").map(String::as_str), Some("42"));
    }
}
