use serde_json::json;

/// Per-request credentials for the speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub region: String,
}

/// Immutable assessment options for one recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSpec {
    pub grading_system: String,
    pub granularity: String,
    pub dimension: String,
    pub scenario_id: String,
    pub enable_miscue: bool,
    pub enable_prosody: bool,
    pub nbest_phoneme_count: u32,
    pub phoneme_alphabet: String,
    pub reference_text: String,
}

impl Default for AssessmentSpec {
    fn default() -> Self {
        Self {
            grading_system: "HundredMark".to_string(),
            granularity: "Phoneme".to_string(),
            dimension: "Comprehensive".to_string(),
            scenario_id: String::new(),
            enable_miscue: false,
            enable_prosody: true,
            nbest_phoneme_count: 0,
            phoneme_alphabet: "IPA".to_string(),
            reference_text: String::new(),
        }
    }
}

impl AssessmentSpec {
    /// Render the configuration document the speech backend expects.
    /// The reference text travels separately, not inside this document.
    pub fn to_backend_config(&self) -> serde_json::Value {
        json!({
            "GradingSystem": self.grading_system,
            "Granularity": self.granularity,
            "Dimension": self.dimension,
            "ScenarioId": self.scenario_id,
            "EnableMiscue": self.enable_miscue,
            "EnableProsodyAssessment": self.enable_prosody,
            "NBestPhonemeCount": self.nbest_phoneme_count,
            "PhonemeAlphabet": self.phoneme_alphabet,
        })
    }
}

/// Everything a backend needs to run one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub spec: AssessmentSpec,
    pub credentials: Credentials,
    pub language: String,
}

impl SessionOptions {
    pub fn new(spec: AssessmentSpec, credentials: Credentials) -> Self {
        Self {
            spec,
            credentials,
            language: "en-US".to_string(),
        }
    }
}

/// One incremental result produced by the backend for a recognized segment.
/// Opaque to everything except the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEvent {
    payload: serde_json::Value,
}

impl ResultEvent {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Single-line JSON, safe to embed in an SSE data frame.
    pub fn to_json(&self) -> String {
        self.payload.to_string()
    }
}

/// What travels through the relay: zero or more events, then exactly one
/// terminal marker.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayItem {
    Event(ResultEvent),
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_spec_defaults() {
        let spec = AssessmentSpec::default();
        assert_eq!(spec.grading_system, "HundredMark");
        assert_eq!(spec.granularity, "Phoneme");
        assert_eq!(spec.dimension, "Comprehensive");
        assert_eq!(spec.scenario_id, "");
        assert!(!spec.enable_miscue);
        assert!(spec.enable_prosody);
        assert_eq!(spec.nbest_phoneme_count, 0);
        assert_eq!(spec.phoneme_alphabet, "IPA");
        assert_eq!(spec.reference_text, "");
    }

    #[test]
    fn test_backend_config_document_keys() {
        let spec = AssessmentSpec {
            enable_miscue: true,
            reference_text: "hello world".to_string(),
            ..Default::default()
        };
        let doc = spec.to_backend_config();
        assert_eq!(doc["GradingSystem"], "HundredMark");
        assert_eq!(doc["EnableMiscue"], true);
        assert_eq!(doc["EnableProsodyAssessment"], true);
        assert_eq!(doc["NBestPhonemeCount"], 0);
        assert_eq!(doc["PhonemeAlphabet"], "IPA");
        // Reference text is not part of the config document
        assert!(doc.get("ReferenceText").is_none());
    }

    #[test]
    fn test_session_options_default_language() {
        let options = SessionOptions::new(
            AssessmentSpec::default(),
            Credentials {
                key: "k".to_string(),
                region: "eastus".to_string(),
            },
        );
        assert_eq!(options.language, "en-US");
    }

    #[test]
    fn test_result_event_to_json_is_single_line() {
        let event = ResultEvent::new(serde_json::json!({
            "DisplayText": "hello",
            "NBest": [{"Confidence": 0.9}],
        }));
        let line = event.to_json();
        assert!(!line.contains('\n'));
        assert!(line.contains("DisplayText"));
    }
}
