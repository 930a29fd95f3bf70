use async_trait::async_trait;
use prosogate_audio::AudioSource;
use prosogate_core::{ResultEvent, SessionError, SessionOptions};
use tokio::sync::{mpsc, watch};

/// Consumed interface over the black-box speech recognizer.
///
/// The backend owns the audio source from `configure` onward and pulls it
/// on its own schedule. Incremental results go out through the event
/// sender; the end signal flips to `true` exactly once, on normal stop or
/// cancellation alike. `stop` must be safe to call after the end signal
/// has already fired.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    fn name(&self) -> &str;

    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<ResultEvent>);

    fn set_end_signal(&mut self, signal: watch::Sender<bool>);

    async fn configure(
        &mut self,
        audio: AudioSource,
        options: SessionOptions,
    ) -> Result<(), SessionError>;

    /// Begin continuous recognition. Returns immediately; results and the
    /// end signal arrive asynchronously.
    async fn start(&self) -> Result<(), SessionError>;

    async fn stop(&self) -> Result<(), SessionError>;
}
