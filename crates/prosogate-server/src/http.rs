use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::Stream;
use prosogate_audio::fetch;
use prosogate_core::{
    result_relay, AppConfig, AssessmentSpec, Credentials, FetchError, RelayConsumer, RelayItem,
    SessionOptions,
};
use prosogate_engine::BackendRegistry;
use serde::Deserialize;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use crate::worker::SessionWorker;

/// Frame that closes every stream. Sent bare, not JSON-encoded.
const DONE_FRAME: &str = "[DONE]";

const HEADER_SPEECH_KEY: &str = "speech-key";
const HEADER_SERVICE_REGION: &str = "service-region";

pub struct AppState {
    pub config: AppConfig,
    pub registry: BackendRegistry,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            registry: BackendRegistry::new(),
            client: reqwest::Client::new(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(assess))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "prosogate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    pub url: String,

    #[serde(default)]
    pub reference_text: String,

    #[serde(default = "default_grading_system")]
    pub grading_system: String,

    #[serde(default = "default_granularity")]
    pub granularity: String,

    #[serde(default = "default_dimension")]
    pub dimension: String,

    #[serde(default)]
    pub scenario_id: String,

    #[serde(default)]
    pub enable_miscue: bool,

    #[serde(default = "default_true")]
    pub enable_prosody: bool,

    #[serde(default)]
    pub nbest_phoneme_count: u32,

    #[serde(default = "default_phoneme_alphabet")]
    pub phoneme_alphabet: String,
}

fn default_grading_system() -> String {
    "HundredMark".to_string()
}

fn default_granularity() -> String {
    "Phoneme".to_string()
}

fn default_dimension() -> String {
    "Comprehensive".to_string()
}

fn default_phoneme_alphabet() -> String {
    "IPA".to_string()
}

fn default_true() -> bool {
    true
}

impl AssessRequest {
    fn to_spec(&self) -> AssessmentSpec {
        AssessmentSpec {
            grading_system: self.grading_system.clone(),
            granularity: self.granularity.clone(),
            dimension: self.dimension.clone(),
            scenario_id: self.scenario_id.clone(),
            enable_miscue: self.enable_miscue,
            enable_prosody: self.enable_prosody,
            nbest_phoneme_count: self.nbest_phoneme_count,
            phoneme_alphabet: self.phoneme_alphabet.clone(),
            reference_text: self.reference_text.clone(),
        }
    }
}

/// Run one assessment: download the audio, hand it to a session worker,
/// and stream every relayed result back as an SSE frame. All failures
/// before the session starts are plain error responses; once the stream
/// has begun, the only way out is the terminal frame.
async fn assess(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<AssessRequest>,
) -> Response {
    let credentials = match resolve_credentials(&headers, &state.config) {
        Some(credentials) => credentials,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                format!(
                    "missing {HEADER_SPEECH_KEY} / {HEADER_SERVICE_REGION} headers \
                     and no credentials configured"
                ),
            )
                .into_response()
        }
    };

    let download_dir = Path::new(&state.config.general.download_dir);
    let audio_path = match fetch::download(&state.client, &request.url, download_dir).await {
        Ok(path) => path,
        Err(FetchError::UpstreamStatus { status, body }) => {
            tracing::warn!(url = %request.url, status, "audio download rejected by upstream");
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            return (code, body).into_response();
        }
        Err(e) => {
            tracing::warn!(url = %request.url, "audio download failed: {e}");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let backend = match state.registry.create(&state.config.backend.engine) {
        Ok(backend) => backend,
        Err(e) => {
            // No session was started, so the worker cleanup path does not
            // run; remove the download here.
            let _ = tokio::fs::remove_file(&audio_path).await;
            tracing::error!("backend lookup failed: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    tracing::info!(
        url = %request.url,
        backend = %state.config.backend.engine,
        region = %credentials.region,
        "starting recognition session"
    );

    let options = SessionOptions::new(request.to_spec(), credentials);
    let (producer, consumer) = result_relay();
    let worker = SessionWorker::spawn(backend, audio_path, options, producer);

    Sse::new(relay_stream(consumer, worker)).into_response()
}

/// Header credentials win; the config fallback covers single-tenant
/// deployments with fixed server-side credentials.
fn resolve_credentials(headers: &HeaderMap, config: &AppConfig) -> Option<Credentials> {
    let key = headers
        .get(HEADER_SPEECH_KEY)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let region = headers
        .get(HEADER_SERVICE_REGION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match (key, region) {
        (Some(key), Some(region)) => Some(Credentials {
            key: key.to_string(),
            region: region.to_string(),
        }),
        _ => config.credentials.as_ref().map(|c| Credentials {
            key: c.key.clone(),
            region: c.region.clone(),
        }),
    }
}

enum DrainState {
    Open(RelayConsumer, SessionWorker),
    Finished,
}

/// Drain the relay into SSE frames. The stream ends only after the
/// terminal marker: the worker's liveness is never consulted, so an
/// event pushed just before the worker exits is still delivered. A
/// closed relay without a marker (worker panic) also yields the final
/// frame so the client cannot hang.
fn relay_stream(
    consumer: RelayConsumer,
    worker: SessionWorker,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures_util::stream::unfold(DrainState::Open(consumer, worker), |state| async move {
        match state {
            DrainState::Open(mut consumer, worker) => match consumer.recv().await {
                Some(RelayItem::Event(event)) => {
                    let frame = Event::default().data(event.to_json());
                    Some((Ok(frame), DrainState::Open(consumer, worker)))
                }
                Some(RelayItem::Done) | None => {
                    worker.join().await;
                    Some((Ok(Event::default().data(DONE_FRAME)), DrainState::Finished))
                }
            },
            DrainState::Finished => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_decode(body: &str) -> AssessRequest {
        serde_urlencoded::from_str(body).unwrap()
    }

    #[test]
    fn test_assess_request_defaults() {
        let request = form_decode("url=http%3A%2F%2Fhost%2Fclip.mp3");
        assert_eq!(request.url, "http://host/clip.mp3");
        assert_eq!(request.reference_text, "");
        assert_eq!(request.grading_system, "HundredMark");
        assert_eq!(request.granularity, "Phoneme");
        assert_eq!(request.dimension, "Comprehensive");
        assert_eq!(request.scenario_id, "");
        assert!(!request.enable_miscue);
        assert!(request.enable_prosody);
        assert_eq!(request.nbest_phoneme_count, 0);
        assert_eq!(request.phoneme_alphabet, "IPA");
    }

    #[test]
    fn test_assess_request_overrides() {
        let request = form_decode(
            "url=http%3A%2F%2Fhost%2Fclip.mp3&reference_text=hello&grading_system=FivePoint\
             &enable_miscue=true&enable_prosody=false&phoneme_alphabet=SAPI",
        );
        assert_eq!(request.reference_text, "hello");
        assert_eq!(request.grading_system, "FivePoint");
        assert!(request.enable_miscue);
        assert!(!request.enable_prosody);
        assert_eq!(request.phoneme_alphabet, "SAPI");
    }

    #[test]
    fn test_assess_request_missing_url_fails() {
        let result: Result<AssessRequest, _> = serde_urlencoded::from_str("reference_text=hi");
        assert!(result.is_err());
    }

    #[test]
    fn test_to_spec_carries_all_fields() {
        let request = form_decode(
            "url=u&reference_text=read+me&enable_miscue=true&scenario_id=custom1\
             &nbest_phoneme_count=5",
        );
        let spec = request.to_spec();
        assert_eq!(spec.reference_text, "read me");
        assert!(spec.enable_miscue);
        assert_eq!(spec.scenario_id, "custom1");
        assert_eq!(spec.nbest_phoneme_count, 5);
    }

    #[test]
    fn test_resolve_credentials_headers_win_over_config() {
        let config = AppConfig::from_toml_str(
            r#"
[credentials]
key = "config-key"
region = "config-region"
"#,
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SPEECH_KEY, "header-key".parse().unwrap());
        headers.insert(HEADER_SERVICE_REGION, "westus".parse().unwrap());

        let credentials = resolve_credentials(&headers, &config).unwrap();
        assert_eq!(credentials.key, "header-key");
        assert_eq!(credentials.region, "westus");
    }

    #[test]
    fn test_resolve_credentials_falls_back_to_config() {
        let config = AppConfig::from_toml_str(
            r#"
[credentials]
key = "config-key"
region = "eastus"
"#,
        )
        .unwrap();

        let credentials = resolve_credentials(&HeaderMap::new(), &config).unwrap();
        assert_eq!(credentials.key, "config-key");
        assert_eq!(credentials.region, "eastus");
    }

    #[test]
    fn test_resolve_credentials_partial_headers_fall_back() {
        let config = AppConfig::from_toml_str("").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SPEECH_KEY, "only-key".parse().unwrap());
        assert!(resolve_credentials(&headers, &config).is_none());
    }
}
