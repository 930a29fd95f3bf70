use crate::backend::SpeechBackend;
use prosogate_core::SessionError;
use std::collections::HashMap;

pub struct BackendRegistry {
    factories: HashMap<String, fn() -> Box<dyn SpeechBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || Box::new(crate::null_backend::NullBackend::new()));
        #[cfg(feature = "azure")]
        registry.register("azure", || {
            Box::new(crate::azure_backend::AzureBackend::new())
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn SpeechBackend>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn SpeechBackend>, SessionError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| SessionError::BackendNotFound(name.to_string()))
    }

    pub fn list_backends(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
