use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use campuslive_domain::{DomainEvent, EventCategory, NavigationTarget, SoundKey};

use crate::ports::outbound::{
    AudioError, AudioHandle, AudioPort, NavigatorPort, NotificationSchedulerPort, PermissionPort,
    PermissionStatus, SchedulingError, StorageProvider, SystemNotificationRequest,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn event(category: EventCategory, title: &str) -> DomainEvent {
    DomainEvent::new(category, title, format!("{} content", title))
}

pub fn message_event(title: &str) -> DomainEvent {
    event(EventCategory::Message, title)
}

/// Key/value storage kept in memory.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }
}

impl StorageProvider for MemoryStorage {
    fn save(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_string(), value.to_string());
    }

    fn load(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn remove(&self, key: &str) {
        lock(&self.values).remove(key);
    }
}

/// Records every request.
#[derive(Default)]
pub struct RecordingScheduler {
    requests: Mutex<Vec<SystemNotificationRequest>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SystemNotificationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl NotificationSchedulerPort for RecordingScheduler {
    async fn schedule(&self, request: SystemNotificationRequest) -> Result<(), SchedulingError> {
        lock(&self.requests).push(request);
        Ok(())
    }
}

/// Permission fixed at construction; `request()` answers with `on_request`.
pub struct StaticPermission {
    status: Mutex<PermissionStatus>,
    on_request: PermissionStatus,
    requests: AtomicU64,
}

impl StaticPermission {
    pub fn new(status: PermissionStatus, on_request: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            on_request,
            requests: AtomicU64::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, PermissionStatus::Denied)
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionPort for StaticPermission {
    async fn status(&self) -> PermissionStatus {
        *lock(&self.status)
    }

    async fn request(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut status = lock(&self.status);
        if *status == PermissionStatus::Undetermined {
            *status = self.on_request;
        }
        *status
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl RecordingNavigator {
    pub fn targets(&self) -> Vec<NavigationTarget> {
        lock(&self.targets).clone()
    }
}

impl NavigatorPort for RecordingNavigator {
    fn navigate(&self, target: &NavigationTarget) {
        lock(&self.targets).push(target.clone());
    }
}

#[derive(Default)]
struct AudioState {
    loaded: BTreeMap<u64, SoundKey>,
    playing: BTreeSet<u64>,
    plays: Vec<SoundKey>,
    unloads: usize,
}

/// Audio backend that tracks which clips are loaded and audible.
#[derive(Default)]
pub struct RecordingAudioBackend {
    next_handle: AtomicU64,
    failing: Mutex<BTreeSet<String>>,
    state: Mutex<AudioState>,
}

impl RecordingAudioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loading `key` fails from now on.
    pub fn fail_load(&self, key: &str) {
        lock(&self.failing).insert(key.to_string());
    }

    pub fn loaded(&self) -> Vec<SoundKey> {
        lock(&self.state).loaded.values().cloned().collect()
    }

    pub fn playing(&self) -> Vec<SoundKey> {
        let state = lock(&self.state);
        state
            .playing
            .iter()
            .filter_map(|handle| state.loaded.get(handle).cloned())
            .collect()
    }

    /// Every `play_from_start`, in call order.
    pub fn plays(&self) -> Vec<SoundKey> {
        lock(&self.state).plays.clone()
    }

    pub fn unload_count(&self) -> usize {
        lock(&self.state).unloads
    }
}

#[async_trait]
impl AudioPort for RecordingAudioBackend {
    async fn load(&self, key: &SoundKey, source: &Path) -> Result<AudioHandle, AudioError> {
        if lock(&self.failing).contains(key.as_str()) {
            return Err(AudioError::Load {
                key: key.clone(),
                reason: format!("cannot decode {}", source.display()),
            });
        }
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.state).loaded.insert(handle, key.clone());
        Ok(AudioHandle(handle))
    }

    async fn play_from_start(&self, handle: AudioHandle) -> Result<(), AudioError> {
        let mut state = lock(&self.state);
        let key = state
            .loaded
            .get(&handle.0)
            .cloned()
            .ok_or(AudioError::UnknownHandle(handle))?;
        state.playing.insert(handle.0);
        state.plays.push(key);
        Ok(())
    }

    async fn stop(&self, handle: AudioHandle) -> Result<(), AudioError> {
        let mut state = lock(&self.state);
        if !state.loaded.contains_key(&handle.0) {
            return Err(AudioError::UnknownHandle(handle));
        }
        state.playing.remove(&handle.0);
        Ok(())
    }

    async fn unload(&self, handle: AudioHandle) -> Result<(), AudioError> {
        let mut state = lock(&self.state);
        state.playing.remove(&handle.0);
        state
            .loaded
            .remove(&handle.0)
            .ok_or(AudioError::UnknownHandle(handle))?;
        state.unloads += 1;
        Ok(())
    }
}
