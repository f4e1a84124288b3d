use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::domain::SourceFormat;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which vendor format the project export is in
    pub hmi_type: SourceFormat,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
    pub cpa: CpaConfig,
    pub neoproj: NeoProjConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    pub cpa_file: Option<String>,
    /// `.zip` package or an already extracted project folder
    pub neoproj_file: Option<String>,
    /// Auto-detected in `dir` when unset
    pub tags_export_file: Option<String>,
    /// Auto-detected in `dir` when unset
    pub alarms_export_file: Option<String>,
    pub csv_file: Option<String>,
    pub l5k_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub extracted_file: String,
    pub enriched_file: String,
    pub mtl_file: String,
    pub report_file: String,
    pub metrics_file: String,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub enable_csv: bool,
    pub enable_l5k: bool,
    /// Drop records that appear on no screen after the merge
    pub filter_unused_ios: bool,
    pub expand_abbreviations: bool,
    pub apply_capitalization: bool,
    pub preserve_acronyms: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CpaConfig {
    /// Screen object kinds whose `IO=` binding marks an address as used
    pub graphic_objects: Vec<String>,
    /// Screen names skipped by the parser, compared case-insensitively
    pub excluded_screens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeoProjConfig {
    pub rack_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hmi_type: SourceFormat::Cpa,
            input: InputConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
            cpa: CpaConfig::default(),
            neoproj: NeoProjConfig::default(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/input"),
            cpa_file: None,
            neoproj_file: None,
            tags_export_file: None,
            alarms_export_file: None,
            csv_file: None,
            l5k_file: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/output"),
            extracted_file: constants::EXTRACTED_FILE.to_string(),
            enriched_file: constants::ENRICHED_FILE.to_string(),
            mtl_file: constants::MTL_FILE.to_string(),
            report_file: constants::REPORT_FILE.to_string(),
            metrics_file: constants::METRICS_FILE.to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enable_csv: true,
            enable_l5k: true,
            filter_unused_ios: false,
            expand_abbreviations: true,
            apply_capitalization: true,
            preserve_acronyms: true,
        }
    }
}

impl Default for CpaConfig {
    fn default() -> Self {
        Self {
            graphic_objects: constants::DEFAULT_GRAPHIC_OBJECTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_screens: constants::DEFAULT_EXCLUDED_SCREENS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for NeoProjConfig {
    fn default() -> Self {
        Self {
            rack_prefixes: vec!["RACK".to_string()],
        }
    }
}

impl Config {
    /// Load `mtl.toml` from the working directory, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(constants::DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `path`, then apply `.env` and `MTL_*` environment overrides.
    ///
    /// A missing file is not an error; a file that exists but does not parse is.
    pub fn load_from(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let config_content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            info!("Loaded configuration from {}", path.display());
            Self::from_toml(&config_content)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("MTL_HMI_TYPE") {
            self.hmi_type = value.parse()?;
        }
        if let Ok(value) = std::env::var("MTL_INPUT_DIR") {
            self.input.dir = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("MTL_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(value);
        }
        Ok(())
    }

    fn input_path(&self, name: &Option<String>) -> Option<PathBuf> {
        name.as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| self.input.dir.join(n))
    }

    /// Path of the project container for the configured HMI type.
    pub fn project_path(&self) -> Option<PathBuf> {
        match self.hmi_type {
            SourceFormat::Cpa => self.input_path(&self.input.cpa_file),
            SourceFormat::NeoProj => self.input_path(&self.input.neoproj_file),
        }
    }

    pub fn csv_path(&self) -> Option<PathBuf> {
        if !self.processing.enable_csv {
            return None;
        }
        self.input_path(&self.input.csv_file)
    }

    pub fn l5k_path(&self) -> Option<PathBuf> {
        if !self.processing.enable_l5k {
            return None;
        }
        self.input_path(&self.input.l5k_file)
    }

    /// Explicit Tags Export file, or the first auto-detected one in the input directory.
    pub fn tags_export_path(&self) -> Option<PathBuf> {
        self.input_path(&self.input.tags_export_file)
            .filter(|p| p.exists())
            .or_else(|| find_first_match(&self.input.dir, constants::TAGS_EXPORT_PATTERNS))
    }

    /// Explicit Alarms Export file, or the first auto-detected one in the input directory.
    pub fn alarms_export_path(&self) -> Option<PathBuf> {
        self.input_path(&self.input.alarms_export_file)
            .filter(|p| p.exists())
            .or_else(|| find_first_match(&self.input.dir, constants::ALARMS_EXPORT_PATTERNS))
    }

    pub fn extracted_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.extracted_file)
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.enriched_file)
    }

    pub fn mtl_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.mtl_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.report_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.metrics_file)
    }
}

/// Find the first file in `dir` whose name ends with one of `patterns`, tried in order.
///
/// Each pattern stands for the glob `*<pattern>`. Matching is case-insensitive and
/// candidates for one pattern are taken in name order.
pub fn find_first_match(dir: &Path, patterns: &[&str]) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut names: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    names.sort();

    patterns.iter().find_map(|suffix| {
        let suffix = suffix.to_ascii_lowercase();
        names
            .iter()
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.to_ascii_lowercase().ends_with(&suffix))
                    .unwrap_or(false)
            })
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.hmi_type, SourceFormat::Cpa);
        assert!(config.processing.enable_csv);
        assert!(!config.processing.filter_unused_ios);
        assert_eq!(config.output.extracted_file, "01_extracted_ios.json");
        assert!(config
            .cpa
            .excluded_screens
            .iter()
            .any(|s| s == "scrap 2"));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
hmi_type = "NEOPROJ"

[input]
dir = "fixtures"
neoproj_file = "Plant.zip"

[processing]
enable_l5k = false
"#,
        )
        .unwrap();

        assert_eq!(config.hmi_type, SourceFormat::NeoProj);
        assert_eq!(
            config.project_path(),
            Some(PathBuf::from("fixtures/Plant.zip"))
        );
        assert!(config.l5k_path().is_none());
        assert!(config.processing.enable_csv);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("hmi_type = [").is_err());
    }

    #[test]
    fn test_find_first_match_respects_pattern_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Plant_TagsExport.xlsx"), b"").unwrap();
        fs::write(dir.path().join("Plant_Tags Export.xlsx"), b"").unwrap();

        let found = find_first_match(dir.path(), constants::TAGS_EXPORT_PATTERNS).unwrap();
        assert_eq!(
            found.file_name().unwrap().to_str().unwrap(),
            "Plant_Tags Export.xlsx"
        );
    }

    #[test]
    fn test_find_first_match_none_in_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(find_first_match(dir.path(), constants::ALARMS_EXPORT_PATTERNS).is_none());
    }
}
