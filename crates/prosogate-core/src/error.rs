use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to write audio file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session configuration failed: {0}")]
    ConfigureFailed(String),

    #[error("session start failed: {0}")]
    StartFailed(String),

    #[error("session stop failed: {0}")]
    StopFailed(String),

    #[error("speech backend not found: {0}")]
    BackendNotFound(String),

    #[error("invalid session transition: {0}")]
    InvalidTransition(String),
}
