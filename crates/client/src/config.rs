//! Client configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::application::services::banner_queue::DEFAULT_BANNER_DURATION;
use crate::infrastructure::messaging::backoff::{
    ReconnectPolicy, DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_INITIAL_RETRY_DELAY_MS,
    DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_MAX_RETRY_DELAY_MS,
};
use crate::ports::outbound::{AuthToken, PermissionStatus};

const DEFAULT_WS_URL: &str = "ws://localhost:3000/ws";
const DEFAULT_SOUNDS_DIR: &str = "./assets/sounds";
/// Longest accepted banner display time (one hour).
const MAX_BANNER_DURATION_MS: u64 = 3_600_000;

/// Client configuration loaded from environment
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Event stream endpoint (ws:// or wss://)
    pub ws_url: Url,
    /// Token to log in with at startup
    pub auth_token: Option<AuthToken>,
    /// Directory holding `<key>.wav` notification sounds
    pub sounds_dir: PathBuf,
    /// How long a banner stays up
    pub banner_duration: Duration,
    pub reconnect: ReconnectPolicy,
    /// Status reported by the desktop permission adapter
    pub notification_permission: PermissionStatus,
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ws_url = lookup("CAMPUSLIVE_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        let ws_url = Url::parse(&ws_url).context("CAMPUSLIVE_WS_URL must be a valid URL")?;
        if !matches!(ws_url.scheme(), "ws" | "wss") {
            bail!(
                "CAMPUSLIVE_WS_URL must use ws:// or wss://, got {}://",
                ws_url.scheme()
            );
        }

        let reconnect = ReconnectPolicy {
            max_attempts: parse_or(
                &lookup,
                "CAMPUSLIVE_RECONNECT_MAX_ATTEMPTS",
                DEFAULT_MAX_RETRY_ATTEMPTS,
            )?,
            initial_delay: millis_or(
                &lookup,
                "CAMPUSLIVE_RECONNECT_INITIAL_DELAY_MS",
                DEFAULT_INITIAL_RETRY_DELAY_MS,
            )?,
            max_delay: millis_or(
                &lookup,
                "CAMPUSLIVE_RECONNECT_MAX_DELAY_MS",
                DEFAULT_MAX_RETRY_DELAY_MS,
            )?,
            handshake_timeout: millis_or(
                &lookup,
                "CAMPUSLIVE_HANDSHAKE_TIMEOUT_MS",
                DEFAULT_HANDSHAKE_TIMEOUT_MS,
            )?,
        };
        if reconnect.max_delay < reconnect.initial_delay {
            bail!("CAMPUSLIVE_RECONNECT_MAX_DELAY_MS must not be below the initial delay");
        }

        let banner_duration = millis_or(
            &lookup,
            "CAMPUSLIVE_BANNER_DURATION_MS",
            DEFAULT_BANNER_DURATION.as_millis() as u64,
        )?;
        if banner_duration.is_zero()
            || banner_duration > Duration::from_millis(MAX_BANNER_DURATION_MS)
        {
            bail!(
                "CAMPUSLIVE_BANNER_DURATION_MS must be between 1 and {}, got {}",
                MAX_BANNER_DURATION_MS,
                banner_duration.as_millis()
            );
        }

        let notification_permission = match lookup("CAMPUSLIVE_NOTIFICATION_PERMISSION") {
            Some(raw) => raw
                .parse::<PermissionStatus>()
                .map_err(anyhow::Error::msg)
                .context("CAMPUSLIVE_NOTIFICATION_PERMISSION must be granted, denied or undetermined")?,
            None => PermissionStatus::Granted,
        };

        Ok(Self {
            ws_url,
            auth_token: lookup("CAMPUSLIVE_AUTH_TOKEN")
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .map(AuthToken::new),
            sounds_dir: lookup("CAMPUSLIVE_SOUNDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOUNDS_DIR)),
            banner_duration,
            reconnect,
            notification_permission,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw)),
        None => Ok(default),
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration> {
    parse_or(lookup, key, default_ms).map(Duration::from_millis)
}
