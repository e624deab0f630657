//! HTTP transport
//!
//! The transport only moves JSON; status handling and error-message
//! extraction are shared by every backend through [`ensure_success`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::HttpRequest;
use crate::constants::{limits, messages};

/// Error types for HTTP calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("{}", messages::REQUEST_TIMEOUT)]
    Timeout,

    #[error("{}: {}", messages::NETWORK_ERROR, .0)]
    Network(String),

    /// Non-success status with the best message the body offered
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{}: {}", messages::MALFORMED_RESPONSE, .0)]
    MalformedBody(String),
}

/// A response body, parsed as JSON when possible
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(json) => Self::Json(json),
            Err(_) => Self::Text(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends prepared requests. Implemented over reqwest in production and by
/// in-memory mocks in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport with a hard per-request timeout
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(classify)?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.http_client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            body: ResponseBody::from_text(text),
        })
    }
}

/// Map a reqwest failure, dropping the URL since it may carry the key
fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        network_error(&error.without_url().to_string())
    }
}

fn network_error(message: &str) -> TransportError {
    TransportError::Network(truncate(message))
}

/// Turn a response into its JSON body or an error carrying the best message
pub fn ensure_success(response: HttpResponse) -> Result<Value, TransportError> {
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            message: extract_error_message(&response.body, response.status),
        });
    }
    match response.body {
        ResponseBody::Json(json) => Ok(json),
        ResponseBody::Text(text) => Err(TransportError::MalformedBody(truncate(&text))),
    }
}

/// Best available message: `error.message`, then `message`, then a string
/// `error`, then the raw body; cut to a bounded length.
pub fn extract_error_message(body: &ResponseBody, status: u16) -> String {
    let message = match body {
        ResponseBody::Json(json) => json
            .pointer("/error/message")
            .and_then(Value::as_str)
            .or_else(|| json.get("message").and_then(Value::as_str))
            .or_else(|| json.get("error").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| json.to_string()),
        ResponseBody::Text(text) => text.clone(),
    };

    let message = message.trim();
    if message.is_empty() {
        format!("HTTP {}", status)
    } else {
        truncate(message)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(limits::ERROR_MESSAGE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(body: ResponseBody) -> String {
        match ensure_success(HttpResponse { status: 400, body }) {
            Err(TransportError::Status { status, message }) => {
                assert_eq!(status, 400);
                message
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_message_priority() {
        assert_eq!(
            failure(ResponseBody::Json(json!({
                "error": {"message": "quota exceeded"},
                "message": "outer"
            }))),
            "quota exceeded"
        );
        assert_eq!(
            failure(ResponseBody::Json(json!({"message": "outer", "error": "inner"}))),
            "outer"
        );
        assert_eq!(failure(ResponseBody::Json(json!({"error": "bad key"}))), "bad key");
        assert_eq!(failure(ResponseBody::Text("gateway down".into())), "gateway down");
        assert_eq!(failure(ResponseBody::Text("  ".into())), "HTTP 400");
    }

    #[test]
    fn test_message_truncated() {
        let long = "界".repeat(500);
        let message = failure(ResponseBody::Text(long));
        assert_eq!(message.chars().count(), limits::ERROR_MESSAGE_MAX_CHARS);
    }

    #[test]
    fn test_network_message_truncated() {
        let long = format!("connection reset: {}", "x".repeat(1000));
        match network_error(&long) {
            TransportError::Network(message) => {
                assert_eq!(message.chars().count(), limits::ERROR_MESSAGE_MAX_CHARS);
                assert!(message.starts_with("connection reset: "));
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[test]
    fn test_body_parsing() {
        assert_eq!(
            ResponseBody::from_text("{\"a\":1}".into()),
            ResponseBody::Json(json!({"a": 1}))
        );
        assert_eq!(
            ResponseBody::from_text("<html>".into()),
            ResponseBody::Text("<html>".into())
        );

        let err = ensure_success(HttpResponse {
            status: 200,
            body: ResponseBody::Text("<html>".into()),
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::MalformedBody(_)));
    }
}
