//! Notification Dispatcher - routes each inbound event to exactly one surface.
//!
//! - Foreground: an in-app banner plus the selected notification sound
//! - Background, enabled and permitted: one OS-level notification
//! - Anything else: dropped on purpose, never buffered
//!
//! Events are handled one at a time in delivery order by a single worker fed
//! from the connection's subscriptions, so the transport never waits on us.

use std::sync::Arc;

use campuslive_domain::{BannerId, DomainEvent, EventCategory, NavigationTarget, NotificationRequestId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::services::banner_queue::BannerQueue;
use crate::application::services::sound_assets::SoundAssetStore;
use crate::infrastructure::messaging::{ConnectionManager, SubscriptionId};
use crate::ports::outbound::{
    AppStateProvider, NavigatorPort, NotificationSchedulerPort, NotificationTrigger,
    PermissionPort, PreferenceStorePort, SystemNotificationRequest,
};

/// What happened to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Banner(BannerId),
    Scheduled(NotificationRequestId),
    /// The scheduler refused; logged and not retried.
    SchedulingFailed(NotificationRequestId),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    PermissionDenied,
    NotificationsDisabled,
}

/// Payload attached to system notifications and handed back when one is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NotificationData {
    category: EventCategory,
    group: String,
    #[serde(default)]
    navigation: Option<NavigationTarget>,
}

/// Notification channel/group for the OS notification center.
fn notification_group(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Message => "chat",
        EventCategory::ParticipationStatusChanged => "participation",
        EventCategory::NewParticipant | EventCategory::NewCheckin => "organizer",
    }
}

pub struct NotificationDispatcher {
    app_state: Arc<dyn AppStateProvider>,
    permission: Arc<dyn PermissionPort>,
    scheduler: Arc<dyn NotificationSchedulerPort>,
    preferences: Arc<dyn PreferenceStorePort>,
    banners: BannerQueue,
    sounds: Arc<SoundAssetStore>,
}

impl NotificationDispatcher {
    pub fn new(
        app_state: Arc<dyn AppStateProvider>,
        permission: Arc<dyn PermissionPort>,
        scheduler: Arc<dyn NotificationSchedulerPort>,
        preferences: Arc<dyn PreferenceStorePort>,
        banners: BannerQueue,
        sounds: Arc<SoundAssetStore>,
    ) -> Self {
        Self {
            app_state,
            permission,
            scheduler,
            preferences,
            banners,
            sounds,
        }
    }

    /// Route one event. Foreground state is read exactly once.
    pub async fn on_domain_event(&self, event: DomainEvent) -> DispatchOutcome {
        if self.app_state.is_foreground() {
            return self.present_in_app(&event);
        }

        if !self.preferences.notifications_enabled() {
            tracing::debug!(category = %event.category, "Background event dropped: notifications disabled");
            return DispatchOutcome::Dropped(DropReason::NotificationsDisabled);
        }
        if !self.permission.status().await.is_granted() {
            tracing::debug!(category = %event.category, "Background event dropped: permission not granted");
            return DispatchOutcome::Dropped(DropReason::PermissionDenied);
        }

        self.schedule_system_notification(event).await
    }

    fn present_in_app(&self, event: &DomainEvent) -> DispatchOutcome {
        let banner_id = self.banners.enqueue_event(event);
        let key = self.preferences.selected_sound_key();
        tracing::debug!(category = %event.category, %banner_id, key = %key, "Foreground event shown as banner");

        // Sound never holds up the next event.
        let sounds = Arc::clone(&self.sounds);
        tokio::spawn(async move {
            sounds.play(&key).await;
        });

        DispatchOutcome::Banner(banner_id)
    }

    async fn schedule_system_notification(&self, event: DomainEvent) -> DispatchOutcome {
        let id = NotificationRequestId::new();
        let data = NotificationData {
            category: event.category,
            group: notification_group(event.category).to_string(),
            navigation: event.navigation_target,
        };
        let data = match serde_json::to_value(&data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode notification data");
                serde_json::Value::Null
            }
        };
        let request = SystemNotificationRequest {
            id,
            title: event.title,
            body: event.content,
            data,
            trigger: NotificationTrigger::Immediate,
        };

        match self.scheduler.schedule(request).await {
            Ok(()) => {
                tracing::debug!(category = %event.category, notification_id = %id, "System notification scheduled");
                DispatchOutcome::Scheduled(id)
            }
            Err(e) => {
                tracing::warn!(category = %event.category, notification_id = %id, error = %e, "System notification failed");
                DispatchOutcome::SchedulingFailed(id)
            }
        }
    }

    /// Feed this dispatcher from every event category of `manager`.
    pub fn attach(self: &Arc<Self>, manager: &ConnectionManager) -> DispatcherHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<DomainEvent>();
        let subscriptions = EventCategory::ALL
            .into_iter()
            .map(|category| {
                let tx = tx.clone();
                manager.subscribe(category, move |event| {
                    let _ = tx.send(event);
                })
            })
            .collect();

        let cancel = CancellationToken::new();
        let dispatcher = Arc::clone(self);
        let worker_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                dispatcher.on_domain_event(event).await;
            }
            tracing::debug!("Dispatcher worker stopped");
        });

        DispatcherHandle {
            manager: manager.clone(),
            subscriptions,
            cancel,
            task: Some(task),
        }
    }
}

/// Open a delivered system notification: navigate to the target it carries.
///
/// Returns false when `data` holds no usable target.
pub fn handle_notification_opened(data: &serde_json::Value, navigator: &dyn NavigatorPort) -> bool {
    let target = match serde_json::from_value::<NotificationData>(data.clone()) {
        Ok(data) => data.navigation,
        // A bare `{path, query}` target is accepted too.
        Err(_) => serde_json::from_value::<NavigationTarget>(data.clone()).ok(),
    };

    match target {
        Some(target) => {
            tracing::info!(path = %target.path, "Opening delivered notification");
            navigator.navigate(&target);
            true
        }
        None => {
            tracing::warn!(data = %data, "Opened notification carries no navigation target");
            false
        }
    }
}

/// Keeps the dispatcher attached. Dropping it unsubscribes and stops the worker.
pub struct DispatcherHandle {
    manager: ConnectionManager,
    subscriptions: Vec<SubscriptionId>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Detach and wait for the event being handled (if any) to finish.
    pub async fn shutdown(mut self) {
        self.detach();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn detach(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.manager.unsubscribe(id);
        }
        self.cancel.cancel();
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
