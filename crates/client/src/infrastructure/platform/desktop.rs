//! Desktop implementations of the OS-facing ports.
//!
//! A headless desktop process has no notification center or router of its own,
//! so scheduling and navigation are surfaced through the log. Foreground state
//! and permission are driven by the embedding application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use campuslive_domain::NavigationTarget;

use crate::ports::outbound::{
    AppStateProvider, NavigatorPort, NotificationSchedulerPort, PermissionPort, PermissionStatus,
    SchedulingError, SystemNotificationRequest,
};

/// Foreground flag flipped by the host on activate/deactivate.
#[derive(Clone, Debug)]
pub struct ForegroundFlag {
    foreground: Arc<AtomicBool>,
}

impl ForegroundFlag {
    pub fn new(foreground: bool) -> Self {
        Self {
            foreground: Arc::new(AtomicBool::new(foreground)),
        }
    }

    pub fn set(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::SeqCst);
    }
}

impl Default for ForegroundFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AppStateProvider for ForegroundFlag {
    fn is_foreground(&self) -> bool {
        self.foreground.load(Ordering::SeqCst)
    }
}

/// Permission decided by configuration instead of an OS prompt.
///
/// While `Undetermined`, a `request()` resolves to the configured answer, the
/// way a user would answer the prompt once.
pub struct ConfiguredPermission {
    status: Mutex<PermissionStatus>,
    answer: PermissionStatus,
}

impl ConfiguredPermission {
    pub fn new(status: PermissionStatus, answer: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            answer,
        }
    }

    /// Already decided; requests never change it.
    pub fn fixed(status: PermissionStatus) -> Self {
        Self::new(status, status)
    }

    fn lock(&self) -> MutexGuard<'_, PermissionStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PermissionPort for ConfiguredPermission {
    async fn status(&self) -> PermissionStatus {
        *self.lock()
    }

    async fn request(&self) -> PermissionStatus {
        let mut status = self.lock();
        if *status == PermissionStatus::Undetermined {
            *status = self.answer;
            tracing::info!(status = ?*status, "Notification permission answered");
        }
        *status
    }
}

/// Posts notifications to the log and keeps them so the host can "open" one.
#[derive(Default)]
pub struct LoggingNotificationScheduler {
    delivered: Mutex<Vec<SystemNotificationRequest>>,
}

impl LoggingNotificationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered notifications, oldest first.
    pub fn delivered(&self) -> Vec<SystemNotificationRequest> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationSchedulerPort for LoggingNotificationScheduler {
    async fn schedule(&self, request: SystemNotificationRequest) -> Result<(), SchedulingError> {
        tracing::info!(
            notification_id = %request.id,
            title = %request.title,
            body = %request.body,
            "System notification posted"
        );
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingNavigator;

impl NavigatorPort for LoggingNavigator {
    fn navigate(&self, target: &NavigationTarget) {
        tracing::info!(path = %target.path, query = ?target.query, "Navigate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslive_domain::NotificationRequestId;

    use crate::ports::outbound::NotificationTrigger;

    #[test]
    fn foreground_flag_is_shared_between_clones() {
        let flag = ForegroundFlag::default();
        let other = flag.clone();
        other.set(false);
        assert!(!flag.is_foreground());
    }

    #[test]
    fn permission_status_parses_config_values() {
        assert_eq!("Granted".parse(), Ok(PermissionStatus::Granted));
        assert_eq!(" denied ".parse(), Ok(PermissionStatus::Denied));
        assert_eq!("prompt".parse(), Ok(PermissionStatus::Undetermined));
        assert!("maybe".parse::<PermissionStatus>().is_err());
    }

    #[tokio::test]
    async fn undetermined_permission_resolves_once() {
        let permission =
            ConfiguredPermission::new(PermissionStatus::Undetermined, PermissionStatus::Granted);
        assert_eq!(permission.status().await, PermissionStatus::Undetermined);
        assert_eq!(permission.request().await, PermissionStatus::Granted);
        assert_eq!(permission.status().await, PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn denied_permission_stays_denied() {
        let permission = ConfiguredPermission::fixed(PermissionStatus::Denied);
        assert_eq!(permission.request().await, PermissionStatus::Denied);
    }

    #[tokio::test]
    async fn scheduler_keeps_delivered_requests() {
        let scheduler = LoggingNotificationScheduler::new();
        let request = SystemNotificationRequest {
            id: NotificationRequestId::new(),
            title: "Chess club".into(),
            body: "Approved".into(),
            data: serde_json::json!({}),
            trigger: NotificationTrigger::Immediate,
        };

        scheduler.schedule(request.clone()).await.expect("scheduled");

        assert_eq!(scheduler.delivered(), vec![request]);
    }
}
