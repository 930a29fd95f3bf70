use crate::backend::SpeechBackend;
use prosogate_audio::AudioSource;
use prosogate_core::{ResultEvent, SessionError, SessionOptions};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configured,
    Running,
    Stopped,
}

/// Consumer ends of the channels a configured session emits on.
pub struct SessionChannels {
    pub events: mpsc::UnboundedReceiver<ResultEvent>,
    pub ended: watch::Receiver<bool>,
}

/// One recognition attempt against one audio source.
///
/// `Idle -> Configured -> Running -> Stopped`, driven by `configure`,
/// `start`, and the backend's end signal. There is no way back out of
/// `Stopped`; a new session is required for a new attempt.
pub struct RecognitionSession {
    backend: Box<dyn SpeechBackend>,
    state: SessionState,
    ended: Option<watch::Receiver<bool>>,
}

impl RecognitionSession {
    pub fn new(backend: Box<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            state: SessionState::Idle,
            ended: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// True once the backend has signalled stop or cancellation.
    pub fn has_ended(&self) -> bool {
        self.ended.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Bind the audio source and options to the backend without starting
    /// recognition. Returns the receivers the caller drains.
    pub async fn configure(
        &mut self,
        audio: AudioSource,
        options: SessionOptions,
    ) -> Result<SessionChannels, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidTransition(format!(
                "configure called in state {:?}",
                self.state
            )));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (end_tx, end_rx) = watch::channel(false);

        self.backend.set_event_sender(event_tx);
        self.backend.set_end_signal(end_tx);
        self.backend.configure(audio, options).await?;

        self.ended = Some(end_rx.clone());
        self.state = SessionState::Configured;

        Ok(SessionChannels {
            events: event_rx,
            ended: end_rx,
        })
    }

    /// Begin continuous recognition. Non-blocking; the backend delivers
    /// events and the end signal on its own tasks.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Configured {
            return Err(SessionError::InvalidTransition(format!(
                "start called in state {:?}",
                self.state
            )));
        }
        self.backend.start().await?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Request the backend halt. A no-op once the session has stopped or
    /// the backend has already signalled its end.
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }
        if self.state == SessionState::Running && !self.has_ended() {
            self.backend.stop().await?;
        }
        self.state = SessionState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted_backend::ScriptedBackend;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixture_audio(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("prosogate_session_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"fake-audio").unwrap();
        path
    }

    fn options() -> SessionOptions {
        SessionOptions::new(
            Default::default(),
            prosogate_core::Credentials {
                key: "k".to_string(),
                region: "eastus".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_session_state_machine_happy_path() {
        let backend = Box::new(ScriptedBackend::new(vec![json!({"n": 1})]));
        let mut session = RecognitionSession::new(backend);
        assert_eq!(session.state(), SessionState::Idle);

        let path = fixture_audio("happy.bin");
        let audio = AudioSource::open(&path).unwrap();
        let mut channels = session.configure(audio, options()).await.unwrap();
        assert_eq!(session.state(), SessionState::Configured);

        session.start().await.unwrap();
        assert_eq!(session.state(), SessionState::Running);

        // Wait for the backend to finish
        tokio::time::timeout(Duration::from_secs(2), async {
            while !*channels.ended.borrow() {
                channels.ended.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        session.stop().await.unwrap();
        assert_eq!(session.state(), SessionState::Stopped);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_session_start_before_configure_fails() {
        let backend = Box::new(ScriptedBackend::new(vec![]));
        let mut session = RecognitionSession::new(backend);
        match session.start().await {
            Err(SessionError::InvalidTransition(msg)) => assert!(msg.contains("Idle")),
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_double_configure_fails() {
        let backend = Box::new(ScriptedBackend::new(vec![]));
        let mut session = RecognitionSession::new(backend);

        let path = fixture_audio("double.bin");
        let audio = AudioSource::open(&path).unwrap();
        session.configure(audio, options()).await.unwrap();

        let audio = AudioSource::open(&path).unwrap();
        let result = session.configure(audio, options()).await;
        assert!(matches!(result, Err(SessionError::InvalidTransition(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_session_stop_idempotent_after_end_signal() {
        let backend = Box::new(ScriptedBackend::new(vec![]));
        let mut session = RecognitionSession::new(backend);

        let path = fixture_audio("idempotent.bin");
        let audio = AudioSource::open(&path).unwrap();
        let mut channels = session.configure(audio, options()).await.unwrap();
        session.start().await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !*channels.ended.borrow() {
                channels.ended.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert!(session.has_ended());

        // Repeated stops after the end signal never error
        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert_eq!(session.state(), SessionState::Stopped);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_session_configure_failure_stays_idle() {
        let backend = Box::new(ScriptedBackend::new(vec![]).failing_configure());
        let mut session = RecognitionSession::new(backend);

        let path = fixture_audio("cfg_fail.bin");
        let audio = AudioSource::open(&path).unwrap();
        let result = session.configure(audio, options()).await;
        assert!(matches!(result, Err(SessionError::ConfigureFailed(_))));
        assert_eq!(session.state(), SessionState::Idle);

        let _ = std::fs::remove_file(&path);
    }
}
