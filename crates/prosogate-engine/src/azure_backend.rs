use crate::backend::SpeechBackend;
use async_trait::async_trait;
use prosogate_audio::AudioSource;
use prosogate_core::{Credentials, ResultEvent, SessionError, SessionOptions};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

/// Azure Speech pronunciation-assessment backend.
///
/// The session wiring (compressed pull stream, assessment config document,
/// recognized/session-stopped/canceled callbacks) lands here when the SDK
/// is vendored in; until then configure validates the inputs and start
/// terminates the session immediately so callers never hang on the stub.
pub struct AzureBackend {
    credentials: Mutex<Option<Credentials>>,
    audio: Mutex<Option<AudioSource>>,
    event_sender: Mutex<Option<mpsc::UnboundedSender<ResultEvent>>>,
    end_signal: Mutex<Option<watch::Sender<bool>>>,
}

impl AzureBackend {
    pub fn new() -> Self {
        Self {
            credentials: Mutex::new(None),
            audio: Mutex::new(None),
            event_sender: Mutex::new(None),
            end_signal: Mutex::new(None),
        }
    }
}

impl Default for AzureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for AzureBackend {
    fn name(&self) -> &str {
        "azure"
    }

    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<ResultEvent>) {
        *self.event_sender.lock().unwrap() = Some(sender);
    }

    fn set_end_signal(&mut self, signal: watch::Sender<bool>) {
        *self.end_signal.lock().unwrap() = Some(signal);
    }

    async fn configure(
        &mut self,
        audio: AudioSource,
        options: SessionOptions,
    ) -> Result<(), SessionError> {
        if options.credentials.key.is_empty() {
            return Err(SessionError::ConfigureFailed(
                "missing speech key".to_string(),
            ));
        }
        if options.credentials.region.is_empty() {
            return Err(SessionError::ConfigureFailed(
                "missing service region".to_string(),
            ));
        }

        tracing::info!(
            region = %options.credentials.region,
            config = %options.spec.to_backend_config(),
            "AzureBackend configured (stub: Speech SDK not wired)"
        );
        *self.credentials.lock().unwrap() = Some(options.credentials);
        *self.audio.lock().unwrap() = Some(audio);
        Ok(())
    }

    async fn start(&self) -> Result<(), SessionError> {
        let end_signal = self.end_signal.lock().unwrap().clone();
        if let Some(mut audio) = self.audio.lock().unwrap().take() {
            audio.close();
        }
        tokio::spawn(async move {
            if let Some(end) = end_signal {
                let _ = end.send(true);
            }
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
