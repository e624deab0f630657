//! Workbench API - image generation client for two provider protocols
//!
//! This library turns prompt documents into provider calls:
//! - **Gemini-style**: native multi-part `generateContent` with image output
//! - **OpenAI-style**: chat completions (text only)
//!
//! Generation calls run several paced attempts and aggregate partial
//! failures; chat and analysis calls are single-shot.
//!
//! # Example
//!
//! ```rust,ignore
//! use workbench_api::{GenerationRequest, WorkbenchApi, WorkbenchSettings};
//!
//! let settings = WorkbenchSettings::load(&data_dir).await?;
//! let api = WorkbenchApi::from_settings(&settings)?;
//!
//! let request = GenerationRequest::from_parts(document.into_parts());
//! let outcome = api.generate_images(&settings, &request, 3, None).await?;
//! ```

pub mod analysis;
pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod pacing;
pub mod request;
pub mod response;
pub mod safety;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use analysis::{parse_json_loose, AnalysisResult, ChatReply};
pub use backend::{
    BackendCapabilities, BackendError, BackendInfo, BackendRegistry, ChatCompletionsBackend,
    HttpRequest, NativeBackend, ProviderBackend, ProviderEndpoint,
};
pub use config::{AnalysisSettings, ApiFormat, ConfigError, ImageDefaults, WorkbenchSettings};
pub use error::{Result, WorkbenchError};
pub use gateway::WorkbenchApi;
pub use generation::{clamp_count, AttemptCallback, AttemptReport, GenerationOutcome, PartialError};
pub use pacing::{PacingGate, SharedPacingGate};
pub use request::{build_generation_request, GenerationRequest, InlineImage};
pub use response::{extract_output, ExtractedOutput, GeneratedImage, ImageSource, SignedText};
pub use safety::SafetyThreshold;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, ResponseBody, TransportError};
pub use types::{Content, WirePart};
