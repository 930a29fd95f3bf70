pub mod backend;
#[cfg(feature = "azure")]
pub mod azure_backend;
pub mod null_backend;
pub mod registry;
pub mod scripted_backend;
pub mod session;

pub use backend::SpeechBackend;
#[cfg(feature = "azure")]
pub use azure_backend::AzureBackend;
pub use null_backend::NullBackend;
pub use registry::BackendRegistry;
pub use scripted_backend::ScriptedBackend;
pub use session::{RecognitionSession, SessionChannels, SessionState};
