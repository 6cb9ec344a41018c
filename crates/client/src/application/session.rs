//! Session context - owns and wires the notification pipeline.
//!
//! One `AppSession` per signed-in app instance: a connection manager, the
//! dispatcher attached to it, the banner queue and the sound store. The session
//! is created unauthenticated; `login`/`logout` drive the connection.

use std::sync::Arc;
use std::time::Duration;

use campuslive_domain::NotificationPreference;
use tokio::sync::broadcast;

use crate::application::services::banner_queue::{BannerQueue, DEFAULT_BANNER_DURATION};
use crate::application::services::notification_dispatcher::{
    handle_notification_opened, DispatcherHandle, NotificationDispatcher,
};
use crate::application::services::notification_settings::NotificationSettings;
use crate::application::services::sound_assets::{SoundAssetStore, SoundCatalog, SoundStoreGuard};
use crate::infrastructure::messaging::{
    ConnectionManager, ConnectionState, ConnectionStateObserver, ReconnectPolicy,
};
use crate::infrastructure::platform::{ForegroundFlag, StoragePreferenceStore};
use crate::ports::outbound::{
    AppStateProvider, AudioPort, AuthToken, NavigatorPort, NotificationSchedulerPort, PermissionPort,
    PreferenceStorePort, StorageProvider, TransportPort,
};

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub reconnect: ReconnectPolicy,
    pub banner_duration: Duration,
    pub sounds: SoundCatalog,
    pub start_in_foreground: bool,
}

impl SessionConfig {
    pub fn new(sounds: SoundCatalog) -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            banner_duration: DEFAULT_BANNER_DURATION,
            sounds,
            start_in_foreground: true,
        }
    }
}

/// Adapters for the outbound ports.
#[derive(Clone)]
pub struct SessionDeps {
    pub transport: Arc<dyn TransportPort>,
    pub permission: Arc<dyn PermissionPort>,
    pub scheduler: Arc<dyn NotificationSchedulerPort>,
    pub storage: Arc<dyn StorageProvider>,
    pub navigator: Arc<dyn NavigatorPort>,
    pub audio: Arc<dyn AudioPort>,
}

pub struct AppSession {
    connection: ConnectionManager,
    foreground: ForegroundFlag,
    banners: BannerQueue,
    settings: NotificationSettings,
    navigator: Arc<dyn NavigatorPort>,
    dispatcher: DispatcherHandle,
    sounds: SoundStoreGuard,
}

impl AppSession {
    /// Build the pipeline, preload sounds and attach the dispatcher.
    pub async fn start(config: SessionConfig, deps: SessionDeps) -> Self {
        let foreground = ForegroundFlag::new(config.start_in_foreground);
        let preferences: Arc<dyn PreferenceStorePort> =
            Arc::new(StoragePreferenceStore::new(deps.storage));

        let sounds = Arc::new(SoundAssetStore::new(config.sounds, deps.audio));
        sounds.preload_all().await;

        let banners = BannerQueue::new(Arc::clone(&deps.navigator), config.banner_duration);
        let connection = ConnectionManager::new(deps.transport, config.reconnect);

        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(foreground.clone()),
            Arc::clone(&deps.permission),
            deps.scheduler,
            Arc::clone(&preferences),
            banners.clone(),
            Arc::clone(&sounds),
        ));
        let dispatcher = dispatcher.attach(&connection);

        let settings = NotificationSettings::new(preferences, deps.permission, Arc::clone(&sounds));

        tracing::info!("Session started");
        Self {
            connection,
            foreground,
            banners,
            settings,
            navigator: deps.navigator,
            dispatcher,
            sounds: SoundStoreGuard::new(sounds),
        }
    }

    pub fn login(&self, token: AuthToken) {
        tracing::info!("Session authenticated");
        self.connection.login(token);
    }

    pub fn logout(&self) {
        tracing::info!("Session signed out");
        self.connection.logout();
    }

    /// The host app moved to the foreground (`true`) or background.
    ///
    /// Coming back to the foreground gives an errored connection a fresh retry
    /// budget.
    pub fn set_foreground(&self, foreground: bool) {
        self.foreground.set(foreground);
        tracing::debug!(foreground, "App state changed");

        if foreground
            && self.connection.state() == ConnectionState::Errored
            && self.connection.is_authenticated()
        {
            tracing::info!("Foregrounded with errored connection, reconnecting");
            self.connection.connect();
        }
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground.is_foreground()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn observe_connection(&self) -> ConnectionStateObserver {
        self.connection.observer()
    }

    pub fn connection_transitions(&self) -> broadcast::Receiver<ConnectionState> {
        self.connection.transitions()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn banners(&self) -> &BannerQueue {
        &self.banners
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    pub fn preference(&self) -> NotificationPreference {
        self.settings.preference()
    }

    pub fn sounds(&self) -> &Arc<SoundAssetStore> {
        self.sounds.store()
    }

    /// The user opened a delivered system notification carrying `data`.
    pub fn handle_notification_opened(&self, data: &serde_json::Value) -> bool {
        handle_notification_opened(data, self.navigator.as_ref())
    }

    /// Disconnect, stop dispatching and unload every sound.
    pub async fn shutdown(self) {
        self.connection.disconnect();
        self.dispatcher.shutdown().await;
        self.sounds.release().await;
        tracing::info!("Session shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuslive_domain::{DismissReason, EventCategory, NavigationTarget, SoundKey};

    use crate::application::services::banner_queue::BannerEvent;
    use crate::infrastructure::testing::{
        event, message_event, MemoryStorage, RecordingAudioBackend, RecordingNavigator,
        RecordingScheduler, ScriptedTransport, StaticPermission,
    };
    use crate::ports::outbound::TransportSignal;

    struct Harness {
        session: AppSession,
        transport: Arc<ScriptedTransport>,
        scheduler: Arc<RecordingScheduler>,
        navigator: Arc<RecordingNavigator>,
        audio: Arc<RecordingAudioBackend>,
    }

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            handshake_timeout: Duration::from_secs(1),
        }
    }

    async fn harness(permission: StaticPermission) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let scheduler = Arc::new(RecordingScheduler::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let audio = Arc::new(RecordingAudioBackend::new());
        let mut config = SessionConfig::new(SoundCatalog::from_dir("sounds"));
        config.reconnect = policy();

        let session = AppSession::start(
            config,
            SessionDeps {
                transport: transport.clone(),
                permission: Arc::new(permission),
                scheduler: scheduler.clone(),
                storage: Arc::new(MemoryStorage::new()),
                navigator: navigator.clone(),
                audio: audio.clone(),
            },
        )
        .await;

        Harness {
            session,
            transport,
            scheduler,
            navigator,
            audio,
        }
    }

    async fn connected(h: &Harness) -> tokio::sync::mpsc::Sender<TransportSignal> {
        let events = h.transport.accept_next();
        h.session.login(AuthToken::new("token"));
        assert!(
            h.session
                .observe_connection()
                .wait_for(ConnectionState::Connected)
                .await
        );
        events
    }

    #[tokio::test(start_paused = true)]
    async fn login_walks_disconnected_connecting_connected() {
        let h = harness(StaticPermission::granted()).await;
        let mut transitions = h.session.connection_transitions();
        assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);

        let _events = connected(&h).await;

        assert_eq!(transitions.recv().await.ok(), Some(ConnectionState::Connecting));
        assert_eq!(transitions.recv().await.ok(), Some(ConnectionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_event_shows_one_banner_that_expires() {
        let h = harness(StaticPermission::granted()).await;
        let events = connected(&h).await;
        let mut banner_events = h.session.banners().subscribe();

        events
            .send(TransportSignal::Event(event(EventCategory::NewParticipant, "Board games")))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.session.banners().len(), 1);
        assert!(h.scheduler.requests().is_empty());
        assert_eq!(h.audio.plays(), vec![SoundKey::default_key()]);

        tokio::time::sleep(DEFAULT_BANNER_DURATION).await;
        assert!(h.session.banners().is_empty());
        let last = std::iter::from_fn(|| banner_events.try_recv().ok()).last();
        assert!(matches!(
            last,
            Some(BannerEvent::Removed {
                reason: DismissReason::Timeout,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn background_event_with_permission_schedules_once() {
        let h = harness(StaticPermission::granted()).await;
        let events = connected(&h).await;
        h.session.set_foreground(false);

        events
            .send(TransportSignal::Event(message_event("Lin")))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.scheduler.requests().len(), 1);
        assert!(h.session.banners().is_empty());
        assert!(h.audio.plays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn background_event_without_permission_leaves_no_trace() {
        let h = harness(StaticPermission::denied()).await;
        let events = connected(&h).await;
        h.session.set_foreground(false);

        events
            .send(TransportSignal::Event(message_event("Lin")))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(h.scheduler.requests().is_empty());
        assert!(h.session.banners().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tapping_a_banner_navigates_with_its_exact_target() {
        let h = harness(StaticPermission::granted()).await;
        let events = connected(&h).await;
        let target = NavigationTarget::new("Chat").with_param("targetId", "42");

        events
            .send(TransportSignal::Event(message_event("Lin").with_target(target.clone())))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;
        let id = h.session.banners().snapshot()[0].id;

        assert!(h.session.banners().on_tap(id));

        assert_eq!(h.navigator.targets(), vec![target]);
        assert!(h.session.banners().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn opening_a_delivered_notification_navigates() {
        let h = harness(StaticPermission::granted()).await;
        let events = connected(&h).await;
        h.session.set_foreground(false);
        let target = NavigationTarget::new("ActivityDetail").with_param("activityId", "9");

        events
            .send(TransportSignal::Event(
                event(EventCategory::NewCheckin, "Run club").with_target(target.clone()),
            ))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;
        let data = h.scheduler.requests()[0].data.clone();

        assert!(h.session.handle_notification_opened(&data));
        assert_eq!(h.navigator.targets(), vec![target]);
    }

    #[tokio::test(start_paused = true)]
    async fn foregrounding_retries_an_errored_connection() {
        let h = harness(StaticPermission::granted()).await;
        h.session.login(AuthToken::new("token"));
        assert!(
            h.session
                .observe_connection()
                .wait_for(ConnectionState::Errored)
                .await
        );
        let opens = h.transport.open_count();

        h.session.set_foreground(false);
        assert_eq!(h.transport.open_count(), opens);

        let _events = h.transport.accept_next();
        h.session.set_foreground(true);
        assert!(
            h.session
                .observe_connection()
                .wait_for(ConnectionState::Connected)
                .await
        );
        assert_eq!(h.transport.open_count(), opens + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn foregrounding_after_logout_does_not_connect() {
        let h = harness(StaticPermission::granted()).await;
        h.session.logout();

        h.session.set_foreground(true);

        assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
        assert_eq!(h.transport.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_after_relogin_still_reach_the_dispatcher() {
        let h = harness(StaticPermission::granted()).await;
        let _first = connected(&h).await;
        h.session.logout();

        let second = connected(&h).await;
        second
            .send(TransportSignal::Event(message_event("again")))
            .await
            .expect("stream open");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.session.banners().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_disconnects_and_unloads_sounds() {
        let h = harness(StaticPermission::granted()).await;
        let _events = connected(&h).await;
        let observer = h.session.observe_connection();
        let sounds = Arc::clone(h.session.sounds());

        h.session.shutdown().await;

        assert_eq!(observer.state(), ConnectionState::Disconnected);
        assert!(sounds.is_torn_down());
        assert!(h.audio.loaded().is_empty());
    }
}
