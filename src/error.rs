use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudsubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Media tool not found: {0}")]
    ToolNotFound(String),

    #[error("Audio extraction error: {0}")]
    Extraction(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Recognition submission error: {0}")]
    Submission(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Recognition did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CloudsubError>;

/// Pipeline step in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    Upload,
    Submit,
    Recognize,
    Convert,
    Write,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extract => "Audio extraction",
            PipelineStage::Upload => "Audio upload",
            PipelineStage::Submit => "Recognition submission",
            PipelineStage::Recognize => "Speech recognition",
            PipelineStage::Convert => "Subtitle conversion",
            PipelineStage::Write => "Subtitle file write",
        };
        f.write_str(name)
    }
}

/// Error returned by the pipeline: the stage that failed plus the untouched root cause.
#[derive(Error, Debug)]
#[error("{stage} failed")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: CloudsubError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: CloudsubError) -> Self {
        Self { stage, source }
    }

    /// The originating component error.
    pub fn root_cause(&self) -> &CloudsubError {
        &self.source
    }
}
