//! Speaker output through rodio.
//!
//! `rodio::OutputStream` is not `Send`, so the device lives on a dedicated
//! thread driven by a command channel. Clip bytes and handles are managed by
//! the wrapped [`FileAudioBackend`].

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;

use async_trait::async_trait;
use campuslive_domain::SoundKey;
use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::oneshot;

use super::FileAudioBackend;
use crate::ports::outbound::{AudioError, AudioHandle, AudioPort};

enum Command {
    Play {
        handle: AudioHandle,
        bytes: Arc<[u8]>,
        reply: oneshot::Sender<Result<(), AudioError>>,
    },
    Stop(AudioHandle),
}

pub struct RodioAudioBackend {
    clips: FileAudioBackend,
    commands: mpsc::Sender<Command>,
}

impl RodioAudioBackend {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, AudioError> {
        let (commands, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("campuslive-audio".into())
            .spawn(move || output_thread(rx, ready_tx))
            .map_err(|e| AudioError::Playback(e.to_string()))?;

        ready_rx.recv().map_err(|_| AudioError::Unavailable)??;

        Ok(Self {
            clips: FileAudioBackend::new(),
            commands,
        })
    }

    fn send(&self, command: Command) -> Result<(), AudioError> {
        self.commands.send(command).map_err(|_| AudioError::Unavailable)
    }
}

fn output_thread(rx: mpsc::Receiver<Command>, ready: mpsc::Sender<Result<(), AudioError>>) {
    let (_stream, output) = match OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready.send(Ok(()));
            pair
        }
        Err(e) => {
            tracing::warn!(error = %e, "No audio output device");
            let _ = ready.send(Err(AudioError::Unavailable));
            return;
        }
    };

    let mut sinks: HashMap<AudioHandle, Sink> = HashMap::new();
    while let Ok(command) = rx.recv() {
        match command {
            Command::Play {
                handle,
                bytes,
                reply,
            } => {
                // Replacing the sink drops the old one, which stops it.
                sinks.remove(&handle);
                let result = Sink::try_new(&output)
                    .map_err(|e| AudioError::Playback(e.to_string()))
                    .and_then(|sink| {
                        let source = Decoder::new(Cursor::new(bytes))
                            .map_err(|e| AudioError::Playback(e.to_string()))?;
                        sink.append(source);
                        sinks.insert(handle, sink);
                        Ok(())
                    });
                let _ = reply.send(result);
            }
            Command::Stop(handle) => {
                if let Some(sink) = sinks.remove(&handle) {
                    sink.stop();
                }
            }
        }
    }
    tracing::debug!("Audio output thread finished");
}

#[async_trait]
impl AudioPort for RodioAudioBackend {
    async fn load(&self, key: &SoundKey, source: &Path) -> Result<AudioHandle, AudioError> {
        let handle = self.clips.load(key, source).await?;
        let bytes = self.clips.bytes(handle)?;
        if let Err(e) = Decoder::new(Cursor::new(bytes)) {
            let _ = self.clips.unload(handle).await;
            return Err(AudioError::Load {
                key: key.clone(),
                reason: e.to_string(),
            });
        }
        Ok(handle)
    }

    async fn play_from_start(&self, handle: AudioHandle) -> Result<(), AudioError> {
        let bytes = self.clips.bytes(handle)?;
        let (reply, result) = oneshot::channel();
        self.send(Command::Play {
            handle,
            bytes,
            reply,
        })?;
        result.await.map_err(|_| AudioError::Unavailable)??;
        self.clips.play_from_start(handle).await
    }

    async fn stop(&self, handle: AudioHandle) -> Result<(), AudioError> {
        self.clips.stop(handle).await?;
        self.send(Command::Stop(handle))
    }

    async fn unload(&self, handle: AudioHandle) -> Result<(), AudioError> {
        self.send(Command::Stop(handle))?;
        self.clips.unload(handle).await
    }
}
