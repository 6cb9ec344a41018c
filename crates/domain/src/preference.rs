//! User notification preferences (persisted outside this crate).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Catalog key of a notification sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SoundKey(String);

impl SoundKey {
    /// Key used when the user never picked a sound.
    pub const DEFAULT: &'static str = "default";

    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DomainError::validation("Sound key cannot be empty"));
        }
        Ok(Self(key))
    }

    pub fn default_key() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SoundKey {
    fn default() -> Self {
        Self::default_key()
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SoundKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SoundKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SoundKey> for String {
    fn from(value: SoundKey) -> Self {
        value.0
    }
}

/// The two scalar settings the notification pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub notifications_enabled: bool,
    pub selected_sound_key: SoundKey,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            selected_sound_key: SoundKey::default_key(),
        }
    }
}
