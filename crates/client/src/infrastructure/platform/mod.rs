//! Platform adapters
//!
//! Desktop implementations of the platform ports: file-backed storage, the
//! foreground flag, notification permission and scheduling, navigation.

pub mod desktop;
pub mod preferences;
pub mod storage;

pub use desktop::{ConfiguredPermission, ForegroundFlag, LoggingNavigator, LoggingNotificationScheduler};
pub use preferences::StoragePreferenceStore;
pub use storage::DesktopStorageProvider;
