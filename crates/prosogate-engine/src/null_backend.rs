use crate::backend::SpeechBackend;
use async_trait::async_trait;
use prosogate_audio::AudioSource;
use prosogate_core::{ResultEvent, SessionError, SessionOptions};
use serde_json::json;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

const READ_CHUNK_BYTES: usize = 4096;

/// Default backend: drains the audio source to exhaustion, emits one
/// summary event, and signals the end of the session. Keeps the full
/// pipeline exercisable without a vendor SDK.
pub struct NullBackend {
    audio: Mutex<Option<AudioSource>>,
    options: Mutex<Option<SessionOptions>>,
    event_sender: Mutex<Option<mpsc::UnboundedSender<ResultEvent>>>,
    end_signal: Mutex<Option<watch::Sender<bool>>>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            audio: Mutex::new(None),
            options: Mutex::new(None),
            event_sender: Mutex::new(None),
            end_signal: Mutex::new(None),
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
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
        *self.audio.lock().unwrap() = Some(audio);
        *self.options.lock().unwrap() = Some(options);
        Ok(())
    }

    async fn start(&self) -> Result<(), SessionError> {
        let mut audio = self
            .audio
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SessionError::StartFailed("backend not configured".to_string()))?;
        let options = self
            .options
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SessionError::StartFailed("backend not configured".to_string()))?;
        let event_sender = self.event_sender.lock().unwrap().clone();
        let end_signal = self.end_signal.lock().unwrap().clone();

        tokio::spawn(async move {
            let drained = tokio::task::spawn_blocking(move || {
                let mut buf = [0u8; READ_CHUNK_BYTES];
                let mut total = 0usize;
                loop {
                    match audio.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => total += n,
                        Err(e) => {
                            tracing::warn!("audio read failed: {e}");
                            break;
                        }
                    }
                }
                audio.close();
                total
            })
            .await;

            match drained {
                Ok(bytes) => {
                    tracing::debug!(bytes, "null backend drained audio source");
                    if let Some(tx) = event_sender {
                        let event = ResultEvent::new(json!({
                            "Recognizer": "null",
                            "BytesRead": bytes,
                            "ReferenceText": options.spec.reference_text,
                        }));
                        let _ = tx.send(event);
                    }
                }
                Err(e) => tracing::error!("null backend read task failed: {e}"),
            }

            if let Some(end) = end_signal {
                let _ = end.send(true);
            }
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        // The read task owns the source and signals the end itself.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosogate_core::{AssessmentSpec, Credentials};
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixture_audio(name: &str, len: usize) -> PathBuf {
        let dir = std::env::temp_dir().join("prosogate_null_backend_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, vec![0xAB; len]).unwrap();
        path
    }

    fn options() -> SessionOptions {
        SessionOptions::new(
            AssessmentSpec {
                reference_text: "good morning".to_string(),
                ..Default::default()
            },
            Credentials {
                key: "k".to_string(),
                region: "eastus".to_string(),
            },
        )
    }

    #[test]
    fn test_null_backend_name() {
        assert_eq!(NullBackend::new().name(), "null");
    }

    #[tokio::test]
    async fn test_null_backend_start_unconfigured_fails() {
        let backend = NullBackend::new();
        match backend.start().await {
            Err(SessionError::StartFailed(msg)) => assert!(msg.contains("not configured")),
            other => panic!("expected StartFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_backend_drains_source_and_signals_end() {
        let path = fixture_audio("drain.bin", 10_000);
        let mut backend = NullBackend::new();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (end_tx, mut end_rx) = watch::channel(false);
        backend.set_event_sender(event_tx);
        backend.set_end_signal(end_tx);

        let audio = AudioSource::open(&path).unwrap();
        backend.configure(audio, options()).await.unwrap();
        backend.start().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(event.payload()["Recognizer"], "null");
        assert_eq!(event.payload()["BytesRead"], 10_000);
        assert_eq!(event.payload()["ReferenceText"], "good morning");

        tokio::time::timeout(Duration::from_secs(2), async {
            while !*end_rx.borrow() {
                end_rx.changed().await.unwrap();
            }
        })
        .await
        .expect("end signal never fired");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_null_backend_stop_is_noop() {
        let backend = NullBackend::new();
        assert!(backend.stop().await.is_ok());
    }

    #[test]
    fn test_null_backend_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullBackend>();
    }
}
