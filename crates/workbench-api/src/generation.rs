//! Generation orchestrator
//!
//! One call runs `count` sequential attempts against the same request. Each
//! attempt goes through the pacing gate, and failures are recorded instead
//! of aborting the batch.

use serde::Serialize;
use tokio::time::Instant;

use crate::config::WorkbenchSettings;
use crate::constants::{limits, messages};
use crate::error::{Result, WorkbenchError};
use crate::gateway::WorkbenchApi;
use crate::request::{build_generation_request, GenerationRequest};
use crate::response::{extract_output, ExtractedOutput, GeneratedImage, SignedText};

/// A failed attempt, 1-based
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialError {
    pub attempt: u32,
    pub message: String,
}

/// Progress report sent after every attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum AttemptReport {
    Success {
        attempt: u32,
        images: Vec<GeneratedImage>,
        signatures: Vec<Option<String>>,
        companion: Option<SignedText>,
    },
    Failure {
        attempt: u32,
        error: String,
    },
}

impl AttemptReport {
    pub fn attempt(&self) -> u32 {
        match self {
            Self::Success { attempt, .. } | Self::Failure { attempt, .. } => *attempt,
        }
    }
}

/// Per-attempt progress callback
pub type AttemptCallback<'a> = &'a (dyn Fn(&AttemptReport) + Send + Sync);

/// Aggregated result of a generation call with at least one image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub elapsed_ms: u64,
    pub requested_count: u32,
    pub succeeded_count: u32,
    pub failed_count: u32,
    pub partial_errors: Vec<PartialError>,
    pub images: Vec<GeneratedImage>,
    /// Parallel to `images`
    pub signatures: Vec<Option<String>>,
    /// Parallel to `images`: the first signed text of the image's attempt
    pub companions: Vec<Option<SignedText>>,
    /// Text from every answered attempt, in order
    pub text: String,
}

impl GenerationOutcome {
    fn record_success(&mut self, output: ExtractedOutput) {
        self.append_text(&output.text);
        let signatures = output.signatures();
        for (image, signature) in output.images.into_iter().zip(signatures) {
            self.images.push(image);
            self.signatures.push(signature);
            self.companions.push(output.signed_text.clone());
        }
    }

    fn record_failure(&mut self, attempt: u32, message: String) {
        self.failed_count += 1;
        self.partial_errors.push(PartialError { attempt, message });
    }

    /// Attempt text is concatenated as-is, in attempt order
    fn append_text(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

/// Clamp a requested image count into the supported range
pub fn clamp_count(count: u32) -> u32 {
    count.clamp(limits::MIN_IMAGE_COUNT, limits::MAX_IMAGE_COUNT)
}

impl WorkbenchApi {
    /// Run up to `count` paced attempts and aggregate their images.
    ///
    /// Fails without any attempt when the configured format cannot return
    /// images or the request is invalid. Fails after all attempts when none
    /// produced an image.
    pub async fn generate_images(
        &self,
        settings: &WorkbenchSettings,
        request: &GenerationRequest,
        count: u32,
        on_attempt: Option<AttemptCallback<'_>>,
    ) -> Result<GenerationOutcome> {
        let format = settings.api_format;
        let backend = self.registry().get(format)?;
        if !backend.capabilities().image_output {
            return Err(WorkbenchError::UnsupportedFormat(
                messages::IMAGE_OUTPUT_UNSUPPORTED.to_string(),
            ));
        }

        let endpoint = settings.generation_endpoint()?;
        let native = build_generation_request(request, settings)?;
        let requested = clamp_count(count);

        log::info!(
            "Generating {} image(s) with {} model {}",
            requested,
            backend.name(),
            endpoint.model
        );

        let started = Instant::now();
        let mut outcome = GenerationOutcome {
            requested_count: requested,
            ..Default::default()
        };

        for attempt in 1..=requested {
            self.pacing().reserve().await;

            let report = match self.execute(format, &endpoint, &native).await {
                Ok(chunks) => {
                    let output = extract_output(&chunks);
                    if output.images.is_empty() {
                        outcome.append_text(&output.text);
                        let message = messages::NO_IMAGES_RETURNED.to_string();
                        outcome.record_failure(attempt, message.clone());
                        AttemptReport::Failure {
                            attempt,
                            error: message,
                        }
                    } else {
                        let report = AttemptReport::Success {
                            attempt,
                            images: output.images.clone(),
                            signatures: output.signatures(),
                            companion: output.signed_text.clone(),
                        };
                        outcome.record_success(output);
                        report
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    outcome.record_failure(attempt, message.clone());
                    AttemptReport::Failure {
                        attempt,
                        error: message,
                    }
                }
            };

            match &report {
                AttemptReport::Success { images, .. } => {
                    log::info!("Attempt {}/{} returned {} image(s)", attempt, requested, images.len())
                }
                AttemptReport::Failure { error, .. } => {
                    log::warn!("Attempt {}/{} failed: {}", attempt, requested, error)
                }
            }
            if let Some(callback) = on_attempt {
                callback(&report);
            }
        }

        outcome.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        outcome.succeeded_count = requested - outcome.failed_count;

        if outcome.images.is_empty() {
            let message = outcome
                .partial_errors
                .first()
                .map(|error| error.message.clone())
                .unwrap_or_else(|| messages::GENERATION_FAILED.to_string());
            return Err(WorkbenchError::Generation(message));
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::ApiFormat;
    use crate::gateway::testing::{image_response, MockTransport};
    use crate::pacing::PacingGate;
    use crate::transport::TransportError;

    fn settings() -> WorkbenchSettings {
        WorkbenchSettings {
            api_key: "key".into(),
            ..Default::default()
        }
    }

    fn api(transport: Arc<MockTransport>) -> WorkbenchApi {
        WorkbenchApi::new(transport, PacingGate::shared(Duration::from_millis(1000)))
    }

    #[test]
    fn test_clamp_count() {
        assert_eq!(clamp_count(0), 1);
        assert_eq!(clamp_count(3), 3);
        assert_eq!(clamp_count(20), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_is_aggregated() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(image_response(&["A1"], Some(("first", "s1"))));
        transport.push_json(image_response(&[], Some(("sorry", "s2"))));
        transport.push_json(image_response(&["C1", "C2"], None));

        let reports = Mutex::new(Vec::new());
        let callback = |report: &AttemptReport| reports.lock().push(report.clone());

        let outcome = api(transport.clone())
            .generate_images(
                &settings(),
                &GenerationRequest::from_prompt("a fox"),
                3,
                Some(&callback),
            )
            .await
            .unwrap();

        assert_eq!(outcome.requested_count, 3);
        assert_eq!(outcome.succeeded_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(
            outcome.partial_errors,
            vec![PartialError {
                attempt: 2,
                message: "本次请求未返回图片".into()
            }]
        );

        let data: Vec<_> = outcome.images.iter().filter_map(|i| i.inline_data()).collect();
        assert_eq!(data, vec!["A1", "C1", "C2"]);
        assert_eq!(outcome.signatures.len(), 3);
        assert_eq!(outcome.signatures[1].as_deref(), Some("sig-C1-0"));
        assert_eq!(outcome.companions[0].as_ref().unwrap().text, "first");
        assert_eq!(outcome.companions[1], None);
        assert_eq!(outcome.text, "firstsorry");
        assert!(outcome.elapsed_ms >= 2000);

        let reports = reports.lock();
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[1], AttemptReport::Failure { attempt: 2, .. }));
        assert_eq!(reports[2].attempt(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_paced() {
        let transport = Arc::new(MockTransport::new());
        for _ in 0..3 {
            transport.push_json(image_response(&["X"], None));
        }
        api(transport.clone())
            .generate_images(&settings(), &GenerationRequest::from_prompt("x"), 3, None)
            .await
            .unwrap();

        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_share_the_gate() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(image_response(&["A"], None));
        transport.push_json(image_response(&["B"], None));

        let api = api(transport.clone());
        let other = api.clone();
        let settings = settings();
        let request = GenerationRequest::from_prompt("x");

        let (a, b) = tokio::join!(
            api.generate_images(&settings, &request, 1, None),
            other.generate_images(&settings, &request, 1, None),
        );
        assert!(a.is_ok() && b.is_ok());

        let times = transport.call_times();
        assert_eq!(times.len(), 2);
        let gap = if times[1] > times[0] {
            times[1] - times[0]
        } else {
            times[0] - times[1]
        };
        assert!(gap >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_failed_uses_first_message() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(429, serde_json::json!({"error": {"message": "rate limited"}}));
        transport.push_error(TransportError::Timeout);

        let err = api(transport)
            .generate_images(&settings(), &GenerationRequest::from_prompt("x"), 2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::Generation(_)));
        assert_eq!(err.to_string(), "rate limited");
    }

    #[tokio::test]
    async fn test_chat_format_rejected_before_any_call() {
        let transport = Arc::new(MockTransport::new());
        let settings = WorkbenchSettings {
            api_format: ApiFormat::OpenAi,
            openai_api_key: "sk".into(),
            ..Default::default()
        };
        let err = api(transport.clone())
            .generate_images(&settings, &GenerationRequest::from_prompt("x"), 2, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::UnsupportedFormat(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_fails_fast() {
        let transport = Arc::new(MockTransport::new());
        let err = api(transport.clone())
            .generate_images(&settings(), &GenerationRequest::default(), 1, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), messages::EMPTY_PROMPT);

        let err = api(transport.clone())
            .generate_images(
                &WorkbenchSettings::default(),
                &GenerationRequest::from_prompt("x"),
                1,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), messages::MISSING_API_KEY);
        assert_eq!(transport.call_count(), 0);
    }
}
