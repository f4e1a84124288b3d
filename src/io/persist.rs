use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Note, SourceFormat};
use crate::error::{PipelineError, Result};

/// A persisted stage table: the records plus what is needed to trace the run that made them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageArtifact<T> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub hmi_type: SourceFormat,
    /// "extracted", "enriched" or "mtl"
    pub stage: String,
    /// sha256 of the project container the run started from
    #[serde(default)]
    pub source_fingerprint: Option<String>,
    pub records: Vec<T>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl<T> StageArtifact<T> {
    pub fn new(
        run_id: Uuid,
        hmi_type: SourceFormat,
        stage: &str,
        records: Vec<T>,
        notes: Vec<Note>,
    ) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            hmi_type,
            stage: stage.to_string(),
            source_fingerprint: None,
            records,
            notes,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.source_fingerprint = fingerprint;
        self
    }
}

/// Write `value` as pretty JSON, creating the parent directory if needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json_content = serde_json::to_string_pretty(value)?;
    fs::write(path, json_content)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Read a JSON artifact written by an earlier step.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PipelineError::MissingArtifact(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
