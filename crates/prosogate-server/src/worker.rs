use prosogate_audio::AudioSource;
use prosogate_core::{RelayProducer, ResultEvent, SessionOptions};
use prosogate_engine::{RecognitionSession, SessionChannels, SpeechBackend};
use serde_json::json;
use std::path::PathBuf;

/// Owns one recognition attempt end to end on its own task: open the
/// source, run the session, forward every event into the relay, then
/// clean up. Cleanup always runs: whatever happens after the download,
/// the temporary file is deleted and the relay gets its terminal
/// marker, so the client stream can never stall.
pub struct SessionWorker {
    handle: tokio::task::JoinHandle<()>,
}

impl SessionWorker {
    pub fn spawn(
        backend: Box<dyn SpeechBackend>,
        audio_path: PathBuf,
        options: SessionOptions,
        producer: RelayProducer,
    ) -> Self {
        let handle = tokio::spawn(run_session(backend, audio_path, options, producer));
        Self { handle }
    }

    /// Await worker completion. By the time this returns, cleanup has run
    /// and the terminal marker is in the relay.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("session worker task failed: {e}");
        }
    }
}

async fn run_session(
    backend: Box<dyn SpeechBackend>,
    audio_path: PathBuf,
    options: SessionOptions,
    producer: RelayProducer,
) {
    let mut session = RecognitionSession::new(backend);

    let channels = start_session(&mut session, &audio_path, options, &producer).await;
    if let Some(channels) = channels {
        drain_until_ended(channels, &producer).await;
    }

    if let Err(e) = session.stop().await {
        tracing::warn!("session stop failed: {e}");
    }

    match tokio::fs::remove_file(&audio_path).await {
        Ok(()) => tracing::debug!(path = %audio_path.display(), "temporary audio removed"),
        Err(e) => {
            tracing::warn!(path = %audio_path.display(), "failed to remove temporary audio: {e}")
        }
    }

    producer.finish();
}

/// Open, configure, and start. Any failure here becomes one error event
/// so the client sees why the stream ended instead of a bare terminal
/// frame.
async fn start_session(
    session: &mut RecognitionSession,
    audio_path: &PathBuf,
    options: SessionOptions,
    producer: &RelayProducer,
) -> Option<SessionChannels> {
    let audio = match AudioSource::open(audio_path) {
        Ok(audio) => audio,
        Err(e) => {
            tracing::error!(path = %audio_path.display(), "failed to open audio source: {e}");
            producer.push(error_event(&format!("failed to open audio source: {e}")));
            return None;
        }
    };

    let channels = match session.configure(audio, options).await {
        Ok(channels) => channels,
        Err(e) => {
            tracing::error!("session configure failed: {e}");
            producer.push(error_event(&e.to_string()));
            return None;
        }
    };

    if let Err(e) = session.start().await {
        tracing::error!("session start failed: {e}");
        producer.push(error_event(&e.to_string()));
        return None;
    }

    Some(channels)
}

/// Forward backend events into the relay until the end signal fires,
/// then flush whatever the backend pushed before signalling. Events are
/// relayed in arrival order; nothing is dropped between the end signal
/// and the terminal marker.
async fn drain_until_ended(mut channels: SessionChannels, producer: &RelayProducer) {
    loop {
        tokio::select! {
            event = channels.events.recv() => match event {
                Some(event) => producer.push(event),
                None => break,
            },
            changed = channels.ended.changed() => {
                if changed.is_err() || *channels.ended.borrow() {
                    break;
                }
            }
        }
    }

    while let Ok(event) = channels.events.try_recv() {
        producer.push(event);
    }
}

fn error_event(message: &str) -> ResultEvent {
    ResultEvent::new(json!({ "error": message }))
}
