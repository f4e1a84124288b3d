//! File-facing collaborators: reading project containers and exports, persisting tables.
//!
//! Nothing in here knows about tags or classification. The pipeline gets fully
//! materialized inputs from [`PipelineInputs::load`] and hands back tables to [`persist`].

pub mod archive;
pub mod persist;
pub mod table;

pub use archive::ProjectArchive;
pub use table::Table;

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::SourceFormat;
use crate::error::{PipelineError, Result};

/// A project container or auxiliary export, already read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDocument {
    /// A single text file: a `.cpa` project, a CSV export or an L5K program
    Text { name: String, content: String },
    /// An IX Developer project
    Archive(ProjectArchive),
}

impl SourceDocument {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        SourceDocument::Text {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SourceDocument::Text { name, .. } => name,
            SourceDocument::Archive(archive) => archive.name(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SourceDocument::Text { content, .. } => Some(content),
            SourceDocument::Archive(_) => None,
        }
    }

    pub fn as_archive(&self) -> Option<&ProjectArchive> {
        match self {
            SourceDocument::Archive(archive) => Some(archive),
            SourceDocument::Text { .. } => None,
        }
    }

    /// sha256 over the document contents, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            SourceDocument::Text { content, .. } => hasher.update(content.as_bytes()),
            SourceDocument::Archive(archive) => {
                for path in archive.paths() {
                    hasher.update(path.as_bytes());
                    hasher.update(archive.get(path).unwrap_or_default());
                }
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Everything a run reads, loaded up front
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub hmi_type: SourceFormat,
    pub project: Option<SourceDocument>,
    pub tags_export: Option<Table>,
    pub alarms_export: Option<Table>,
    pub csv: Option<SourceDocument>,
    pub l5k: Option<SourceDocument>,
}

impl PipelineInputs {
    pub fn new(hmi_type: SourceFormat) -> Self {
        Self {
            hmi_type,
            project: None,
            tags_export: None,
            alarms_export: None,
            csv: None,
            l5k: None,
        }
    }

    pub fn with_project(mut self, project: SourceDocument) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_tags_export(mut self, table: Table) -> Self {
        self.tags_export = Some(table);
        self
    }

    pub fn with_alarms_export(mut self, table: Table) -> Self {
        self.alarms_export = Some(table);
        self
    }

    pub fn with_csv(mut self, document: SourceDocument) -> Self {
        self.csv = Some(document);
        self
    }

    pub fn with_l5k(mut self, document: SourceDocument) -> Self {
        self.l5k = Some(document);
        self
    }

    /// Read every input the configuration points at.
    ///
    /// Absent optional inputs are simply left out. An absent or unreadable project
    /// container is also left out; the parser reports that as the fatal error.
    pub fn load(config: &Config) -> Result<Self> {
        let mut inputs = Self::new(config.hmi_type);

        if let Some(path) = config.project_path() {
            match read_project(config.hmi_type, &path) {
                Ok(document) => inputs.project = Some(document),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => warn!("Project container {} not loaded: {}", path.display(), err),
            }
        }

        if config.hmi_type == SourceFormat::NeoProj {
            if let Some(path) = config.tags_export_path() {
                info!("Using Tags Export {}", path.display());
                inputs.tags_export = Some(read_table(&path)?);
            }
            if let Some(path) = config.alarms_export_path() {
                info!("Using Alarms Export {}", path.display());
                inputs.alarms_export = Some(read_table(&path)?);
            }
        }

        inputs.csv = read_optional_text(config.csv_path().as_deref())?;
        inputs.l5k = read_optional_text(config.l5k_path().as_deref())?;
        Ok(inputs)
    }

    pub fn fingerprint(&self) -> Option<String> {
        self.project.as_ref().map(SourceDocument::fingerprint)
    }
}

fn read_project(hmi_type: SourceFormat, path: &Path) -> Result<SourceDocument> {
    if !path.exists() {
        return Err(PipelineError::MissingArtifact(path.to_path_buf()));
    }
    match hmi_type {
        SourceFormat::Cpa => {
            let bytes = fs::read(path)?;
            Ok(SourceDocument::text(
                display_name(path),
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
        SourceFormat::NeoProj => Ok(SourceDocument::Archive(ProjectArchive::open(path)?)),
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let bytes = fs::read(path)?;
    Table::from_spreadsheet(&display_name(path), &bytes)
}

fn read_optional_text(path: Option<&Path>) -> Result<Option<SourceDocument>> {
    match path {
        Some(path) if path.exists() => {
            let bytes = fs::read(path)?;
            info!("Loaded {} ({} bytes)", path.display(), bytes.len());
            Ok(Some(SourceDocument::text(
                display_name(path),
                String::from_utf8_lossy(&bytes).into_owned(),
            )))
        }
        Some(path) => {
            warn!("Configured input {} does not exist, skipping", path.display());
            Ok(None)
        }
        None => Ok(None),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
