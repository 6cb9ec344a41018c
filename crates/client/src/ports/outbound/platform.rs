//! Platform abstraction ports
//!
//! These traits abstract platform-specific operations so that:
//! 1. Pipeline code remains platform-agnostic
//! 2. Platform-specific code is isolated in infrastructure
//! 3. Code becomes easily testable with mock implementations

use campuslive_domain::NavigationTarget;

/// Persistent storage abstraction (key/value, file-based on desktop)
pub trait StorageProvider: Send + Sync {
    /// Save a string value with the given key
    fn save(&self, key: &str, value: &str);

    /// Load a string value by key, returns None if not found
    fn load(&self, key: &str) -> Option<String>;

    /// Remove a value by key
    fn remove(&self, key: &str);
}

/// Whether the app is the active, visible process.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AppStateProvider: Send + Sync {
    fn is_foreground(&self) -> bool;
}

/// Application navigation callback.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait NavigatorPort: Send + Sync {
    fn navigate(&self, target: &NavigationTarget);
}

/// Storage key constants
///
/// These are kept in the ports layer as they define the contract for
/// what keys are used across the application.
pub mod storage_keys {
    pub const NOTIFICATIONS_ENABLED: &str = "campuslive_notifications_enabled";
    pub const SELECTED_SOUND_KEY: &str = "campuslive_selected_sound_key";
}
