//! Backend registry keyed by API format
//!
//! Both protocols are always registered; callers can swap one out (tests
//! do) through [`BackendRegistry::register`].

use std::collections::HashMap;
use std::sync::Arc;

use super::{BackendError, BackendInfo, ChatCompletionsBackend, NativeBackend, ProviderBackend};
use crate::config::ApiFormat;

/// Registry of provider protocols
#[derive(Clone)]
pub struct BackendRegistry {
    backends: HashMap<ApiFormat, Arc<dyn ProviderBackend>>,
}

impl BackendRegistry {
    /// Create a registry with both protocols registered
    pub fn new() -> Self {
        let mut registry = Self {
            backends: HashMap::new(),
        };
        registry.register(ApiFormat::Gemini, Arc::new(NativeBackend::new()));
        registry.register(ApiFormat::OpenAi, Arc::new(ChatCompletionsBackend::new()));
        registry
    }

    /// Register (or replace) the backend for a format
    pub fn register(&mut self, format: ApiFormat, backend: Arc<dyn ProviderBackend>) {
        self.backends.insert(format, backend);
    }

    /// Look up the backend for a format
    pub fn get(&self, format: ApiFormat) -> Result<Arc<dyn ProviderBackend>, BackendError> {
        self.backends
            .get(&format)
            .cloned()
            .ok_or(BackendError::NotRegistered(format))
    }

    /// Information about every registered backend, ordered by name
    pub fn list(&self, active: ApiFormat) -> Vec<BackendInfo> {
        let mut infos: Vec<BackendInfo> = self
            .backends
            .iter()
            .map(|(format, backend)| BackendInfo {
                format: *format,
                name: backend.name().to_string(),
                description: backend.description().to_string(),
                capabilities: backend.capabilities(),
                active: *format == active,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_formats_registered() {
        let registry = BackendRegistry::new();
        assert!(registry.get(ApiFormat::Gemini).unwrap().capabilities().image_output);
        assert!(!registry.get(ApiFormat::OpenAi).unwrap().capabilities().image_output);

        let infos = registry.list(ApiFormat::OpenAi);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "Gemini");
        assert!(!infos[0].active);
        assert!(infos[1].active);
    }
}
