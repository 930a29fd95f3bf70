use crate::backend::SpeechBackend;
use async_trait::async_trait;
use prosogate_audio::AudioSource;
use prosogate_core::{ResultEvent, SessionError, SessionOptions};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndBehavior {
    Stop,
    Cancel,
}

/// Test double: replays a fixed event sequence, then signals the end of
/// the session. Cancellation and normal stop drive the same end signal,
/// mirroring how real backends collapse both into one terminal
/// transition. Failure injection covers configure and start.
pub struct ScriptedBackend {
    events: Vec<serde_json::Value>,
    end: EndBehavior,
    fail_configure: bool,
    fail_start: bool,
    event_delay: Option<Duration>,
    audio: Mutex<Option<AudioSource>>,
    event_sender: Mutex<Option<mpsc::UnboundedSender<ResultEvent>>>,
    end_signal: Mutex<Option<watch::Sender<bool>>>,
}

impl ScriptedBackend {
    pub fn new(events: Vec<serde_json::Value>) -> Self {
        Self {
            events,
            end: EndBehavior::Stop,
            fail_configure: false,
            fail_start: false,
            event_delay: None,
            audio: Mutex::new(None),
            event_sender: Mutex::new(None),
            end_signal: Mutex::new(None),
        }
    }

    /// Signal the end via the cancellation path instead of a normal stop.
    pub fn with_cancel(mut self) -> Self {
        self.end = EndBehavior::Cancel;
        self
    }

    /// Pause between events, so consumers observe genuinely incremental
    /// delivery.
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }

    pub fn failing_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

#[async_trait]
impl SpeechBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
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
        _options: SessionOptions,
    ) -> Result<(), SessionError> {
        if self.fail_configure {
            return Err(SessionError::ConfigureFailed(
                "scripted configure failure".to_string(),
            ));
        }
        *self.audio.lock().unwrap() = Some(audio);
        Ok(())
    }

    async fn start(&self) -> Result<(), SessionError> {
        if self.fail_start {
            return Err(SessionError::StartFailed(
                "scripted start failure".to_string(),
            ));
        }

        let events: Vec<ResultEvent> = self.events.iter().cloned().map(ResultEvent::new).collect();
        let end = self.end;
        let delay = self.event_delay;
        let event_sender = self.event_sender.lock().unwrap().clone();
        let end_signal = self.end_signal.lock().unwrap().clone();

        tokio::spawn(async move {
            for event in events {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                if let Some(ref tx) = event_sender {
                    let _ = tx.send(event);
                }
            }
            if end == EndBehavior::Cancel {
                tracing::debug!("scripted backend signalling cancellation");
            }
            if let Some(end) = end_signal {
                let _ = end.send(true);
            }
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        if let Some(mut audio) = self.audio.lock().unwrap().take() {
            audio.close();
        }
        Ok(())
    }
}
