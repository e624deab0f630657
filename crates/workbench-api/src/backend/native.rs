//! Native multi-part protocol (`models/{model}:generateContent`)

use reqwest::Url;

use super::{bearer, BackendCapabilities, BackendError, HttpRequest, ProviderBackend, ProviderEndpoint};
use crate::constants::endpoints;
use crate::types::{NativeEnvelope, NativeRequest, NativeResponse};

/// Gemini-style backend
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn static_capabilities() -> BackendCapabilities {
        BackendCapabilities {
            image_output: true,
            vision: true,
            search: true,
        }
    }

    /// Resolve the endpoint URL and how the key travels.
    ///
    /// The first-party host takes the key as a `key` query parameter; any
    /// other host gets it as a bearer token.
    fn endpoint_url(endpoint: &ProviderEndpoint) -> Result<(Url, bool), BackendError> {
        let base = endpoint.base_url.trim().trim_end_matches('/');
        let model = endpoint.model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        let version = endpoint.api_version.trim().trim_matches('/');

        let raw = if version.is_empty() {
            format!("{}/models/{}:{}", base, model, endpoints::GENERATE_CONTENT_METHOD)
        } else {
            format!(
                "{}/{}/models/{}:{}",
                base,
                version,
                model,
                endpoints::GENERATE_CONTENT_METHOD
            )
        };

        let mut url = Url::parse(&raw).map_err(|e| BackendError::InvalidEndpoint(e.to_string()))?;
        let first_party = url.host_str() == Some(endpoints::FIRST_PARTY_HOST);
        if first_party {
            url.query_pairs_mut()
                .append_pair("key", endpoint.api_key.trim());
        }
        Ok((url, first_party))
    }
}

impl ProviderBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn description(&self) -> &'static str {
        "Native multi-part generateContent protocol with image output"
    }

    fn capabilities(&self) -> BackendCapabilities {
        Self::static_capabilities()
    }

    fn prepare(
        &self,
        endpoint: &ProviderEndpoint,
        request: &NativeRequest,
    ) -> Result<HttpRequest, BackendError> {
        let (url, first_party) = Self::endpoint_url(endpoint)?;
        let body = serde_json::to_value(request).map_err(|e| BackendError::Encode(e.to_string()))?;

        let mut headers = Vec::new();
        if !first_party {
            headers.push(bearer(&endpoint.api_key));
        }

        Ok(HttpRequest {
            url: url.into(),
            headers,
            body,
        })
    }

    fn decode(&self, body: serde_json::Value) -> Result<Vec<NativeResponse>, BackendError> {
        serde_json::from_value::<NativeEnvelope>(body)
            .map(NativeEnvelope::into_chunks)
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}
