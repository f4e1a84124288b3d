use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The top-level project container could not be opened or recognized.
    /// This is the only failure that aborts a run.
    #[error("cannot parse project container ({format}): {reason}")]
    Container { format: String, reason: String },

    #[error("unsafe path in project archive: {0}")]
    UnsafeArchivePath(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("missing pipeline artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
}

impl PipelineError {
    pub fn container(format: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Container {
            format: format.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean no records could be produced at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Container { .. } | PipelineError::UnsafeArchivePath(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
