pub mod config;
pub mod error;
pub mod relay;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, FetchError, SessionError};
pub use relay::{result_relay, RelayConsumer, RelayProducer};
pub use types::{AssessmentSpec, Credentials, RelayItem, ResultEvent, SessionOptions};
