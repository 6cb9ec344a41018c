//! System notification and permission ports.

use std::str::FromStr;

use async_trait::async_trait;
use campuslive_domain::NotificationRequestId;

/// When the OS should present the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTrigger {
    Immediate,
}

/// An OS-level notification request.
///
/// `data` is opaque to the scheduler; it comes back untouched when the user
/// opens the delivered notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemNotificationRequest {
    pub id: NotificationRequestId,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
    pub trigger: NotificationTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Notification scheduler unavailable")]
    Unavailable,
}

/// Port for posting OS-level notifications.
///
/// Failures are reported, never retried by the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationSchedulerPort: Send + Sync {
    async fn schedule(&self, request: SystemNotificationRequest) -> Result<(), SchedulingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

impl FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(PermissionStatus::Granted),
            "denied" => Ok(PermissionStatus::Denied),
            "undetermined" | "prompt" => Ok(PermissionStatus::Undetermined),
            other => Err(format!("unknown permission status '{}'", other)),
        }
    }
}

/// Port for the OS notification permission.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PermissionPort: Send + Sync {
    /// Current status without prompting.
    async fn status(&self) -> PermissionStatus;

    /// Prompt the user if the status is still undetermined.
    async fn request(&self) -> PermissionStatus;
}
