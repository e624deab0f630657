//! Workbench API - single entry point for provider calls
//!
//! The API owns the transport, the backend registry and the shared pacing
//! gate. Settings are not stored here: every operation takes a snapshot so
//! edits apply to the next call without rebuilding anything.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BackendInfo, BackendRegistry, ProviderEndpoint};
use crate::config::{ApiFormat, WorkbenchSettings};
use crate::error::Result;
use crate::pacing::{PacingGate, SharedPacingGate};
use crate::transport::{ensure_success, HttpTransport, ReqwestTransport};
use crate::types::{NativeRequest, NativeResponse};

/// Entry point for generation, chat and analysis calls.
///
/// Cloning is cheap and clones share the same pacing gate.
#[derive(Clone)]
pub struct WorkbenchApi {
    transport: Arc<dyn HttpTransport>,
    registry: BackendRegistry,
    pacing: SharedPacingGate,
}

impl WorkbenchApi {
    /// Create an API over an existing transport and pacing gate
    pub fn new(transport: Arc<dyn HttpTransport>, pacing: SharedPacingGate) -> Self {
        Self {
            transport,
            registry: BackendRegistry::new(),
            pacing,
        }
    }

    /// Create an API with a reqwest transport over the process-wide gate.
    ///
    /// The gate's interval follows the settings; every API built this way
    /// queues behind the same gate.
    pub fn from_settings(settings: &WorkbenchSettings) -> Result<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(settings.request_timeout_secs))?;
        let pacing = PacingGate::global();
        pacing.set_min_interval(Duration::from_millis(settings.min_generation_interval_ms));
        Ok(Self::new(Arc::new(transport), pacing))
    }

    /// Replace the backend registry
    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn pacing(&self) -> &SharedPacingGate {
        &self.pacing
    }

    /// List all protocols with the configured one marked active
    pub fn available_backends(&self, settings: &WorkbenchSettings) -> Vec<BackendInfo> {
        self.registry.list(settings.api_format)
    }

    /// Send one unified request through the backend for `format`
    pub(crate) async fn execute(
        &self,
        format: ApiFormat,
        endpoint: &ProviderEndpoint,
        request: &NativeRequest,
    ) -> Result<Vec<NativeResponse>> {
        let backend = self.registry.get(format)?;
        let http = backend.prepare(endpoint, request)?;

        log::debug!("{} request -> {}", backend.name(), http.redacted_url());
        let response = self.transport.post_json(&http).await?;
        log::debug!("{} response status {}", backend.name(), response.status);

        let body = ensure_success(response)?;
        Ok(backend.decode(body)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport shared by the orchestration tests

    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use crate::backend::HttpRequest;
    use crate::transport::{HttpResponse, HttpTransport, ResponseBody, TransportError};

    /// Replays queued responses and records every call
    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub calls: Mutex<Vec<(Instant, HttpRequest)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_json(&self, body: serde_json::Value) {
            self.responses.lock().push_back(Ok(HttpResponse {
                status: 200,
                body: ResponseBody::Json(body),
            }));
        }

        pub fn push_status(&self, status: u16, body: serde_json::Value) {
            self.responses.lock().push_back(Ok(HttpResponse {
                status,
                body: ResponseBody::Json(body),
            }));
        }

        pub fn push_error(&self, error: TransportError) {
            self.responses.lock().push_back(Err(error));
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().iter().map(|(at, _)| *at).collect()
        }

        pub fn last_body(&self) -> Option<serde_json::Value> {
            self.calls.lock().last().map(|(_, request)| request.body.clone())
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn post_json(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().push((Instant::now(), request.clone()));
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::Network("no response queued".into())))
        }
    }

    /// A native response carrying the given inline images and optional text
    pub fn image_response(images: &[&str], text: Option<(&str, &str)>) -> serde_json::Value {
        let mut parts = Vec::new();
        if let Some((text, signature)) = text {
            parts.push(serde_json::json!({"text": text, "thoughtSignature": signature}));
        }
        for (index, data) in images.iter().enumerate() {
            parts.push(serde_json::json!({
                "inlineData": {"mimeType": "image/png", "data": data},
                "thoughtSignature": format!("sig-{}-{}", data, index)
            }));
        }
        serde_json::json!({"candidates": [{"content": {"role": "model", "parts": parts}}]})
    }
}
