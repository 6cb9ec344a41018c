//! Outbound ports - Interfaces for external collaborators
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the pipeline to talk to the transport, the OS notification scheduler,
//! the permission system, audio output and preference storage without depending
//! on concrete implementations.

pub mod audio_port;
pub mod notification_port;
pub mod platform;
pub mod preference_port;
pub mod transport_port;

pub use audio_port::{AudioError, AudioHandle, AudioPort};
pub use notification_port::{
    NotificationSchedulerPort, NotificationTrigger, PermissionPort, PermissionStatus,
    SchedulingError, SystemNotificationRequest,
};
pub use platform::{storage_keys, AppStateProvider, NavigatorPort, StorageProvider};
pub use preference_port::PreferenceStorePort;
pub use transport_port::{AuthToken, TransportError, TransportPort, TransportSignal, TransportStream};

#[cfg(any(test, feature = "testing"))]
pub use audio_port::MockAudioPort;
#[cfg(any(test, feature = "testing"))]
pub use notification_port::{MockNotificationSchedulerPort, MockPermissionPort};
#[cfg(any(test, feature = "testing"))]
pub use platform::{MockAppStateProvider, MockNavigatorPort};
