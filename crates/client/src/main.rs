//! CampusLive client - headless console entry point.
//!
//! Connects to the event stream and renders banners, system notifications and
//! connection state as console lines. Commands are read from stdin.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use campuslive_client::application::services::{BannerEvent, SoundCatalog};
use campuslive_client::infrastructure::audio::FileAudioBackend;
use campuslive_client::infrastructure::platform::{
    ConfiguredPermission, DesktopStorageProvider, LoggingNavigator, LoggingNotificationScheduler,
};
use campuslive_client::infrastructure::websocket::WebSocketTransport;
use campuslive_client::ports::outbound::{AudioPort, AuthToken, PermissionStatus};
use campuslive_client::{AppSession, ClientConfig, SessionConfig, SessionDeps};
use campuslive_domain::{BannerId, SoundKey};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Login(String),
    Logout,
    Foreground(bool),
    Tap(usize),
    Close(usize),
    Sound(String),
    Notify(bool),
    Open(usize),
    State,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| "empty command".to_string())?;
        let arg = parts.next();
        let index = |arg: Option<&str>| -> Result<usize, String> {
            arg.and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("usage: {} <n> (1-based)", name))
        };

        match name {
            "login" => arg
                .map(|token| Command::Login(token.to_string()))
                .ok_or_else(|| "usage: login <token>".to_string()),
            "logout" => Ok(Command::Logout),
            "fg" => Ok(Command::Foreground(true)),
            "bg" => Ok(Command::Foreground(false)),
            "tap" => index(arg).map(Command::Tap),
            "close" => index(arg).map(Command::Close),
            "open" => index(arg).map(Command::Open),
            "sound" => arg
                .map(|key| Command::Sound(key.to_string()))
                .ok_or_else(|| "usage: sound <key>".to_string()),
            "notify" => match arg {
                Some("on") => Ok(Command::Notify(true)),
                Some("off") => Ok(Command::Notify(false)),
                _ => Err("usage: notify on|off".to_string()),
            },
            "state" => Ok(Command::State),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}', try 'help'", other)),
        }
    }
}

const HELP: &str = "commands: login <token> | logout | fg | bg | tap <n> | close <n> | \
                    sound <key> | notify on|off | open <n> | state | quit";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campuslive_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting CampusLive client");

    let config = ClientConfig::from_env()?;
    tracing::info!(url = %config.ws_url, sounds = ?config.sounds_dir, "Configuration loaded");

    let scheduler = Arc::new(LoggingNotificationScheduler::new());
    let session = AppSession::start(
        SessionConfig {
            reconnect: config.reconnect.clone(),
            banner_duration: config.banner_duration,
            sounds: SoundCatalog::from_dir(&config.sounds_dir),
            start_in_foreground: true,
        },
        SessionDeps {
            transport: Arc::new(WebSocketTransport::new(config.ws_url.clone())),
            permission: Arc::new(ConfiguredPermission::new(
                config.notification_permission,
                PermissionStatus::Granted,
            )),
            scheduler: scheduler.clone(),
            storage: Arc::new(DesktopStorageProvider::new()),
            navigator: Arc::new(LoggingNavigator),
            audio: audio_backend(),
        },
    )
    .await;

    spawn_renderers(&session);

    if let Some(token) = config.auth_token.clone() {
        session.login(token);
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => run_command(&session, &scheduler, command).await,
            Err(message) => println!("{}", message),
        }
    }

    session.shutdown().await;
    Ok(())
}

fn audio_backend() -> Arc<dyn AudioPort> {
    #[cfg(feature = "audio-rodio")]
    {
        use campuslive_client::infrastructure::audio::RodioAudioBackend;
        match RodioAudioBackend::open_default() {
            Ok(backend) => return Arc::new(backend),
            Err(e) => tracing::warn!(error = %e, "Speaker output unavailable, sounds will be logged"),
        }
    }
    Arc::new(FileAudioBackend::new())
}

/// Print banner and connection changes as they happen.
fn spawn_renderers(session: &AppSession) {
    let mut banners = session.banners().subscribe();
    tokio::spawn(async move {
        loop {
            match banners.recv().await {
                Ok(BannerEvent::Shown(item)) => {
                    println!("[banner] {} - {} ({})", item.title, item.message, item.category)
                }
                Ok(BannerEvent::Removed { reason, .. }) => println!("[banner] removed ({:?})", reason),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Banner renderer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut transitions = session.connection_transitions();
    tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(state) => println!("[connection] {}", state),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run_command(
    session: &AppSession,
    scheduler: &LoggingNotificationScheduler,
    command: Command,
) {
    match command {
        Command::Login(token) => session.login(AuthToken::new(token)),
        Command::Logout => session.logout(),
        Command::Foreground(foreground) => session.set_foreground(foreground),
        Command::Tap(n) => {
            if let Some(id) = banner_at(session, n) {
                session.banners().on_tap(id);
            }
        }
        Command::Close(n) => {
            if let Some(id) = banner_at(session, n) {
                session.banners().dismiss(id);
            }
        }
        Command::Sound(key) => {
            let result = match SoundKey::new(key) {
                Ok(key) => session.settings().select_sound(key).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(message) = result {
                println!("{}", message);
            }
        }
        Command::Notify(enabled) => {
            if let Err(e) = session.settings().set_notifications_enabled(enabled).await {
                println!("{}", e);
            }
        }
        Command::Open(n) => match scheduler.delivered().into_iter().nth(n.saturating_sub(1)) {
            Some(request) => {
                session.handle_notification_opened(&request.data);
            }
            None => println!("no notification #{}", n),
        },
        Command::State => {
            let preference = session.preference();
            println!(
                "connection={} foreground={} banners={} notifications={} sound={}",
                session.connection_state(),
                session.is_foreground(),
                session.banners().len(),
                preference.notifications_enabled,
                preference.selected_sound_key
            );
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

/// The `n`-th visible banner, 1-based.
fn banner_at(session: &AppSession, n: usize) -> Option<BannerId> {
    let id = session
        .banners()
        .snapshot()
        .get(n.saturating_sub(1))
        .map(|item| item.id);
    if id.is_none() {
        println!("no banner #{}", n);
    }
    id
}
