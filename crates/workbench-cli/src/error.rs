use std::path::PathBuf;

use prompt_parts::EncodeError;
use workbench_api::{ConfigError, WorkbenchError};

/// Errors that end a command
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Workbench(#[from] WorkbenchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to process image: {0}")]
    Encode(#[from] EncodeError),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Generated image is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to format output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine a settings directory; pass --data-dir")]
    NoDataDir,
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
